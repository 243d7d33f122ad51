//! In-memory stand-in for the remote dataset service

#![allow(dead_code)]

use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;
use surveyprep::DatasetService;
use surveyprep::core::{
    AnalysisResult, AnalyzeRequest, CellValue, CleanReport, CleanRequest, DatasetId,
    HealthStatus, PreviewSnapshot, Row, UploadFile,
};
use surveyprep::error::ServiceError;
use tokio::sync::oneshot;

pub const BASE_URL: &str = "http://survey.test";

/// A request the fake received, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload(String),
    Preview(String),
    Clean(String, CleanRequest),
    Analyze(String, AnalyzeRequest),
    Health,
}

pub type PreviewReply = Result<PreviewSnapshot, ServiceError>;
pub type CleanReply = Result<CleanReport, ServiceError>;

/// A reply available at once, or one held back until the test releases it
enum Script<T> {
    Ready(Result<T, ServiceError>),
    Gated(oneshot::Receiver<Result<T, ServiceError>>),
}

async fn release<T>(script: Option<Script<T>>, endpoint: &str) -> Result<T, ServiceError> {
    match script {
        Some(Script::Ready(reply)) => reply,
        Some(Script::Gated(rx)) => rx
            .await
            .unwrap_or_else(|_| Err(ServiceError::Protocol("gate dropped".into()))),
        None => Err(unscripted(endpoint)),
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    uploads: VecDeque<Result<DatasetId, ServiceError>>,
    previews: VecDeque<Script<PreviewSnapshot>>,
    cleans: VecDeque<Script<CleanReport>>,
    analyses: VecDeque<Result<AnalysisResult, ServiceError>>,
}

/// Replies are scripted per endpoint and handed out first in, first out.
/// An endpoint with nothing scripted answers with a protocol error.
#[derive(Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn upload_reply(self, reply: Result<&str, ServiceError>) -> Self {
        self.state()
            .uploads
            .push_back(reply.map(|id| DatasetId::new(id).unwrap()));
        self
    }

    pub fn preview_reply(self, reply: PreviewReply) -> Self {
        self.state().previews.push_back(Script::Ready(reply));
        self
    }

    /// The reply is delivered only when the returned sender fires
    pub fn gated_preview(&self) -> oneshot::Sender<PreviewReply> {
        let (tx, rx) = oneshot::channel();
        self.state().previews.push_back(Script::Gated(rx));
        tx
    }

    pub fn clean_reply(self, reply: CleanReply) -> Self {
        self.state().cleans.push_back(Script::Ready(reply));
        self
    }

    /// The clean reply is delivered only when the returned sender fires
    pub fn gated_clean(&self) -> oneshot::Sender<CleanReply> {
        let (tx, rx) = oneshot::channel();
        self.state().cleans.push_back(Script::Gated(rx));
        tx
    }

    pub fn analyze_reply(self, reply: Result<AnalysisResult, ServiceError>) -> Self {
        self.state().analyses.push_back(reply);
        self
    }
}

fn unscripted(endpoint: &str) -> ServiceError {
    ServiceError::Protocol(format!("no scripted reply for {endpoint}"))
}

impl DatasetService for FakeService {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn upload(&self, file: &UploadFile) -> Result<DatasetId, ServiceError> {
        let mut state = self.state();
        state.calls.push(Call::Upload(file.file_name.clone()));
        state.uploads.pop_front().unwrap_or_else(|| Err(unscripted("upload")))
    }

    async fn preview(&self, id: &DatasetId) -> Result<PreviewSnapshot, ServiceError> {
        let script = {
            let mut state = self.state();
            state.calls.push(Call::Preview(id.to_string()));
            state.previews.pop_front()
        };
        release(script, "preview").await
    }

    async fn clean(
        &self,
        id: &DatasetId,
        request: &CleanRequest,
    ) -> Result<CleanReport, ServiceError> {
        let script = {
            let mut state = self.state();
            state.calls.push(Call::Clean(id.to_string(), *request));
            state.cleans.pop_front()
        };
        release(script, "clean").await
    }

    async fn analyze(
        &self,
        id: &DatasetId,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisResult, ServiceError> {
        let mut state = self.state();
        state.calls.push(Call::Analyze(id.to_string(), request.clone()));
        state.analyses.pop_front().unwrap_or_else(|| Err(unscripted("analyze")))
    }

    async fn health(&self) -> Result<HealthStatus, ServiceError> {
        self.state().calls.push(Call::Health);
        Ok(HealthStatus {
            status: "ok".into(),
            message: "Survey Data Processing API".into(),
        })
    }
}

pub fn status_error(code: u16, detail: &str) -> ServiceError {
    ServiceError::Status {
        status: StatusCode::from_u16(code).unwrap(),
        detail: Some(detail.to_string()),
    }
}

/// A consistent snapshot over `columns` with `sample` rows of a `total` row table
pub fn snapshot(columns: &[&str], sample: usize, total: u64) -> PreviewSnapshot {
    let rows = (0..sample)
        .map(|i| {
            columns
                .iter()
                .enumerate()
                .map(|(j, c)| {
                    let value = if j == 0 {
                        CellValue::Number((i as u64).into())
                    } else {
                        CellValue::Text(format!("{c}-{i}"))
                    };
                    (c.to_string(), value)
                })
                .collect::<Row>()
        })
        .collect();
    PreviewSnapshot {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
        row_count: total,
        column_count: columns.len() as u64,
    }
}
