use crate::error::{UploadFileError, WorkflowError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Identifier the remote service assigns to an uploaded dataset.
///
/// Opaque to the client: never parsed, only echoed back in request paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetId(String);

impl DatasetId {
    /// Wrap a service-provided identifier; empty strings and the `.`/`..`
    /// path segments are rejected
    pub fn new(id: impl Into<String>) -> Result<Self, WorkflowError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(WorkflowError::invalid_state("dataset id must not be empty"));
        }
        if id == "." || id == ".." {
            return Err(WorkflowError::invalid_state(format!(
                "'{id}' is not a valid dataset id"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DatasetId {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatasetId> for String {
    fn from(id: DatasetId) -> Self {
        id.0
    }
}

/// Client-side identity of one working session, used to tell log lines apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the service fills missing values.
///
/// `Knn` is forwarded as-is; whatever fallback applies is the service's call.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImputationMethod {
    Mean,
    #[default]
    Median,
    Knn,
    None,
}

impl ImputationMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mean => "Mean",
            Self::Median => "Median",
            Self::Knn => "KNN",
            Self::None => "None",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Mean, Self::Median, Self::Knn, Self::None]
    }
}

/// How the service winsorizes outliers
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutlierMethod {
    #[default]
    Iqr,
    Zscore,
    None,
}

impl OutlierMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Iqr => "IQR Winsorize",
            Self::Zscore => "Z-score Winsorize",
            Self::None => "None",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Iqr, Self::Zscore, Self::None]
    }
}

/// Position of a session in the upload/clean/analyze workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Stage {
    #[default]
    Empty,
    Uploading,
    Loaded,
    Cleaning,
    Analyzing,
}

impl Stage {
    /// Whether a dataset id must exist in this stage
    pub fn has_dataset(&self) -> bool {
        !matches!(self, Self::Empty | Self::Uploading)
    }

    /// Check if this stage can transition to another stage
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Empty, Self::Uploading)
                | (Self::Uploading, Self::Empty | Self::Loaded)
                | (Self::Loaded, Self::Cleaning | Self::Analyzing)
                | (Self::Cleaning | Self::Analyzing, Self::Loaded)
        )
    }
}

/// Request families whose responses can arrive out of order, each with its
/// own sequence counter. Upload, clean and analyze are serialized by the
/// stage guards and need none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum OperationKind {
    Preview,
}

/// Extensions the service knows how to ingest
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// A local file the user picked for upload.
///
/// Only the extension is checked; content is left to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl UploadFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadFileError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadFileError::MissingFileName(path.display().to_string()))?
            .to_string();

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(UploadFileError::UnsupportedExtension(extension));
        }

        Ok(Self {
            path: path.to_owned(),
            file_name,
        })
    }
}
