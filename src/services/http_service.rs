use crate::core::{
    AnalysisResult, AnalyzeRequest, CleanReport, CleanRequest, DatasetId, HealthStatus,
    PreviewSnapshot, UploadFile,
};
use crate::error::ServiceError;
use crate::services::{DatasetService, dataset_url};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Deserialize)]
struct UploadResponse {
    dataset_id: String,
}

#[derive(Deserialize)]
struct PreviewEnvelope {
    preview: PreviewSnapshot,
}

#[derive(Deserialize)]
struct CleanResponse {
    #[serde(default)]
    logs: Vec<String>,
}

/// `DatasetService` over HTTP.
///
/// No timeout is configured beyond reqwest's defaults.
#[derive(Debug, Clone)]
pub struct HttpDatasetService {
    http: Client,
    base_url: String,
}

impl HttpDatasetService {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, ServiceError> {
        let http = Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Reuse an existing client (connection pool, proxies, ...)
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn dataset_endpoint(&self, id: &DatasetId, action: &str) -> Result<Url, ServiceError> {
        dataset_url(&self.base_url, id, action)
    }
}

/// Turn a response into `T`, or into a status error carrying the service's
/// `detail` message.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(ServiceError::Status {
            status,
            detail: error_detail(&body),
        });
    }
    serde_json::from_slice(&body).map_err(|e| ServiceError::Decode(e.to_string()))
}

/// Pull a human readable message out of an error body
fn error_detail(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        return match value.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(value.to_string()),
        };
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}

impl DatasetService for HttpDatasetService {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, file: &UploadFile) -> Result<DatasetId, ServiceError> {
        let bytes = tokio::fs::read(&file.path).await?;
        debug!("uploading {} ({} bytes)", file.file_name, bytes.len());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file.file_name.clone()));

        let response = self
            .http
            .post(self.endpoint("/upload"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = decode(response).await?;

        DatasetId::new(body.dataset_id)
            .map_err(|_| ServiceError::Protocol("upload returned an empty dataset_id".into()))
    }

    async fn preview(&self, id: &DatasetId) -> Result<PreviewSnapshot, ServiceError> {
        debug!("fetching preview for {id}");
        let response = self
            .http
            .get(self.dataset_endpoint(id, "preview")?)
            .send()
            .await?;
        let envelope: PreviewEnvelope = decode(response).await?;
        Ok(envelope.preview)
    }

    async fn clean(
        &self,
        id: &DatasetId,
        request: &CleanRequest,
    ) -> Result<CleanReport, ServiceError> {
        debug!(
            "cleaning {id}: imputation={} outliers={}",
            request.imputation_method, request.outlier_method
        );
        let response = self
            .http
            .post(self.dataset_endpoint(id, "clean")?)
            .json(request)
            .send()
            .await?;
        let body: CleanResponse = decode(response).await?;
        Ok(CleanReport { logs: body.logs })
    }

    async fn analyze(
        &self,
        id: &DatasetId,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisResult, ServiceError> {
        debug!("analyzing {id} with weight column {:?}", request.weight_column);
        let response = self
            .http
            .post(self.dataset_endpoint(id, "analyze")?)
            .json(request)
            .send()
            .await?;
        decode(response).await.map(AnalysisResult)
    }

    async fn health(&self) -> Result<HealthStatus, ServiceError> {
        let response = self.http.get(self.endpoint("/")).send().await?;
        decode(response).await
    }
}
