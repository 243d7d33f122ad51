use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the remote dataset service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}{}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("could not decode service response: {0}")]
    Decode(String),

    #[error("could not read upload file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unusable service base url {0}")]
    BaseUrl(String),

    /// Response was well formed but cannot be used
    #[error("unusable service response: {0}")]
    Protocol(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Errors surfaced by the workflow controller, one class per operation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("upload failed: {0}")]
    Upload(#[source] ServiceError),

    #[error("preview fetch failed: {0}")]
    PreviewFetch(#[source] ServiceError),

    /// The service answered, but the snapshot contradicts itself
    #[error("preview rejected: {0}")]
    InvalidPreview(String),

    #[error("cleaning failed: {0}")]
    Clean(#[source] ServiceError),

    #[error("analysis failed: {0}")]
    Analyze(#[source] ServiceError),

    #[error("could not build report url: {0}")]
    Report(#[source] ServiceError),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl WorkflowError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// The service-side cause, when there is one
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Upload(e)
            | Self::PreviewFetch(e)
            | Self::Clean(e)
            | Self::Analyze(e)
            | Self::Report(e) => Some(e),
            Self::InvalidPreview(_) | Self::InvalidState(_) => None,
        }
    }
}

/// Raised when the presentation layer builds an upload from a file the
/// service will not accept.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadFileError {
    #[error("unsupported file type '{0}', expected one of .csv, .xlsx, .xls")]
    UnsupportedExtension(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
