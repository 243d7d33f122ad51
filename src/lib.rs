pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod services;
pub mod workflow;

// Re-export commonly used types
pub use crate::core::{
    CleaningConfig, ConfigPatch, DatasetId, DatasetSession, ImputationMethod, OutlierMethod,
    PreviewSnapshot, SessionView, Stage, UploadFile,
};
pub use error::{ServiceError, UploadFileError, WorkflowError};
pub use services::{DatasetService, HttpDatasetService};
pub use workflow::{Intent, IntentKind, IntentOutcome, WorkflowController};
