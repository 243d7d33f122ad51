pub mod http_service;

pub use http_service::HttpDatasetService;

use crate::core::{
    AnalysisResult, AnalyzeRequest, CleanReport, CleanRequest, DatasetId, HealthStatus,
    PreviewSnapshot, UploadFile,
};
use crate::error::ServiceError;
use reqwest::Url;
use std::future::Future;

/// The remote service that stores datasets and does the cleaning,
/// analysis and report work.
///
/// The workflow controller only talks to it through this trait, so tests can
/// swap in an in-memory double.
pub trait DatasetService {
    /// Base URL every path below is relative to
    fn base_url(&self) -> &str;

    /// `POST /upload` with the file as multipart field `file`
    fn upload(
        &self,
        file: &UploadFile,
    ) -> impl Future<Output = Result<DatasetId, ServiceError>> + Send;

    /// `GET /datasets/{id}/preview`
    fn preview(
        &self,
        id: &DatasetId,
    ) -> impl Future<Output = Result<PreviewSnapshot, ServiceError>> + Send;

    /// `POST /datasets/{id}/clean`
    fn clean(
        &self,
        id: &DatasetId,
        request: &CleanRequest,
    ) -> impl Future<Output = Result<CleanReport, ServiceError>> + Send;

    /// `POST /datasets/{id}/analyze`
    fn analyze(
        &self,
        id: &DatasetId,
        request: &AnalyzeRequest,
    ) -> impl Future<Output = Result<AnalysisResult, ServiceError>> + Send;

    /// `GET /`
    fn health(&self) -> impl Future<Output = Result<HealthStatus, ServiceError>> + Send;

    /// Where the browser goes to view the report. Pure, no request is made.
    fn report_url(&self, id: &DatasetId) -> Result<String, ServiceError> {
        report_url(self.base_url(), id)
    }
}

/// `{base}/datasets/{id}/{action}` with the id encoded as a single path segment
pub fn dataset_url(base_url: &str, id: &DatasetId, action: &str) -> Result<Url, ServiceError> {
    let mut url =
        Url::parse(base_url).map_err(|e| ServiceError::BaseUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ServiceError::BaseUrl(format!("{base_url}: cannot carry a path")))?
        .pop_if_empty()
        .extend(["datasets", id.as_str(), action]);
    Ok(url)
}

/// `{base}/datasets/{id}/report`
pub fn report_url(base_url: &str, id: &DatasetId) -> Result<String, ServiceError> {
    dataset_url(base_url, id, "report").map(String::from)
}
