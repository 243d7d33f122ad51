//! HttpDatasetService against a minimal local HTTP responder

use pretty_assertions::assert_eq;
use serde_json::json;
use surveyprep::core::{
    AnalyzeRequest, CellValue, CleanRequest, DatasetId, ImputationMethod, OutlierMethod,
    PreviewOutcome, Stage, UploadFile,
};
use surveyprep::error::ServiceError;
use surveyprep::{DatasetService, HttpDatasetService, WorkflowController, WorkflowError};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Answer one connection per canned response, returning the raw requests seen
async fn serve(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        requests
    });
    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn body_of(request: &str) -> &str {
    request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
}

fn client(base: &str) -> HttpDatasetService {
    HttpDatasetService::new(base, "surveyprep-test").unwrap()
}

fn preview_body(row_count: u64) -> String {
    json!({
        "dataset_id": "abc123",
        "preview": {
            "columns": ["id", "income", "region"],
            "rows": [
                {"id": 1, "income": 41000.0, "region": "north"},
                {"id": 2, "income": null, "region": "south"}
            ],
            "row_count": row_count,
            "column_count": 3
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_preview_get_and_decode() {
    let (base, server) = serve(vec![("200 OK", preview_body(500))]).await;
    let id = DatasetId::new("abc123").unwrap();

    let snapshot = client(&base).preview(&id).await.unwrap();

    assert_eq!(snapshot.columns, vec!["id", "income", "region"]);
    assert_eq!(snapshot.row_count, 500);
    assert_eq!(snapshot.cell(1, "income"), Some(&CellValue::Null));
    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /datasets/abc123/preview HTTP/1.1"));
}

#[tokio::test]
async fn test_clean_posts_methods_only() {
    let (base, server) = serve(vec![(
        "200 OK",
        json!({"ok": true, "logs": ["Winsorized 3 values in income"], "preview": {}}).to_string(),
    )])
    .await;
    let id = DatasetId::new("abc123").unwrap();
    let request = CleanRequest {
        imputation_method: ImputationMethod::Knn,
        outlier_method: OutlierMethod::Zscore,
    };

    let report = client(&base).clean(&id, &request).await.unwrap();

    assert_eq!(report.logs, vec!["Winsorized 3 values in income"]);
    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /datasets/abc123/clean HTTP/1.1"));
    let sent: serde_json::Value = serde_json::from_str(body_of(&requests[0])).unwrap();
    assert_eq!(sent, json!({"imputation_method": "knn", "outlier_method": "zscore"}));
}

#[tokio::test]
async fn test_analyze_sends_null_weight() {
    let (base, server) = serve(vec![(
        "200 OK",
        json!({"numeric": {}, "categorical": {}, "weight_column": null, "n": 3, "effective_n": 3.0})
            .to_string(),
    )])
    .await;
    let id = DatasetId::new("abc123").unwrap();

    let result = client(&base)
        .analyze(&id, &AnalyzeRequest::for_weight_column(""))
        .await
        .unwrap();

    assert_eq!(result.n(), Some(3));
    let requests = server.await.unwrap();
    assert_eq!(body_of(&requests[0]), r#"{"weight_column":null}"#);
}

#[tokio::test]
async fn test_error_status_carries_detail() {
    let (base, server) = serve(vec![(
        "404 Not Found",
        json!({"detail": "Dataset not found"}).to_string(),
    )])
    .await;
    let id = DatasetId::new("missing").unwrap();

    let err = client(&base).preview(&id).await.unwrap_err();

    match err {
        ServiceError::Status { status, detail } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(detail.as_deref(), Some("Dataset not found"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let (base, server) = serve(vec![("200 OK", json!({"rows": []}).to_string())]).await;
    let id = DatasetId::new("abc123").unwrap();

    let err = client(&base).preview(&id).await.unwrap_err();

    assert!(matches!(err, ServiceError::Decode(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_health() {
    let (base, server) = serve(vec![(
        "200 OK",
        json!({"status": "ok", "message": "Survey Data Processing API"}).to_string(),
    )])
    .await;

    let health = client(&base).health().await.unwrap();

    assert_eq!(health.status, "ok");
    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET / HTTP/1.1"));
}

#[tokio::test]
async fn test_upload_then_preview_over_http() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("survey.csv");
    std::fs::write(&path, "id,income,region\n1,41000,north\n2,,south\n").unwrap();

    let upload_body = json!({
        "dataset_id": "abc123",
        "columns": ["id", "income", "region"],
        "dtypes": {"id": "int64"}
    })
    .to_string();
    let (base, server) = serve(vec![("200 OK", upload_body), ("200 OK", preview_body(2))]).await;
    let controller = WorkflowController::new(client(&base));

    let outcome = controller
        .upload(&UploadFile::from_path(&path).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome, PreviewOutcome::Applied);
    let view = controller.snapshot();
    assert_eq!(view.stage, Stage::Loaded);
    assert_eq!(view.preview.unwrap().row_count, 2);
    assert_eq!(
        controller.report_url().unwrap(),
        format!("{base}/datasets/abc123/report")
    );

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /upload HTTP/1.1"));
    assert!(requests[0].contains(r#"name="file"; filename="survey.csv""#));
    assert!(requests[0].contains("1,41000,north"));
    assert!(requests[1].starts_with("GET /datasets/abc123/preview HTTP/1.1"));
}

#[tokio::test]
async fn test_upload_of_missing_file_is_upload_error() {
    let dir = TempDir::new().unwrap();
    let missing = UploadFile::from_path(dir.path().join("gone.xlsx")).unwrap();
    let controller = WorkflowController::new(client("http://127.0.0.1:9"));

    let err = controller.upload(&missing).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Upload(ServiceError::Io(_))));
    assert_eq!(controller.snapshot().stage, Stage::Empty);
}
