use crate::core::{
    AnalysisResult, CleanOutcome, CleaningConfig, ConfigPatch, PreviewOutcome, Stage, UploadFile,
};
use std::fmt;

/// Everything the presentation layer can ask the controller to do
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Upload(UploadFile),
    Configure(ConfigPatch),
    RefreshPreview,
    RunClean,
    RunAnalyze,
    OpenReport,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Upload(_) => IntentKind::Upload,
            Intent::Configure(_) => IntentKind::Configure,
            Intent::RefreshPreview => IntentKind::RefreshPreview,
            Intent::RunClean => IntentKind::RunClean,
            Intent::RunAnalyze => IntentKind::RunAnalyze,
            Intent::OpenReport => IntentKind::OpenReport,
        }
    }

    /// Whether the controller will accept this intent in `stage`
    pub fn is_available(&self, stage: Stage) -> bool {
        self.kind().is_available(stage)
    }
}

/// Payload-free tag of an `Intent`, for menus and help text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    Upload,
    Configure,
    RefreshPreview,
    RunClean,
    RunAnalyze,
    OpenReport,
}

impl IntentKind {
    pub fn name(&self) -> &'static str {
        match self {
            IntentKind::Upload => "Upload",
            IntentKind::Configure => "Configure",
            IntentKind::RefreshPreview => "RefreshPreview",
            IntentKind::RunClean => "RunClean",
            IntentKind::RunAnalyze => "RunAnalyze",
            IntentKind::OpenReport => "OpenReport",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            IntentKind::Upload => "Upload a CSV or Excel survey file",
            IntentKind::Configure => "Change cleaning configuration",
            IntentKind::RefreshPreview => "Reload the dataset preview",
            IntentKind::RunClean => "Run imputation and outlier handling",
            IntentKind::RunAnalyze => "Run weighted analysis",
            IntentKind::OpenReport => "Open the generated report",
        }
    }

    /// Stages in which the controller accepts the intent.
    ///
    /// Configure is always accepted. Refresh and report only need a dataset.
    pub fn is_available(&self, stage: Stage) -> bool {
        match self {
            IntentKind::Upload => stage == Stage::Empty,
            IntentKind::Configure => true,
            IntentKind::RefreshPreview | IntentKind::OpenReport => stage.has_dataset(),
            IntentKind::RunClean | IntentKind::RunAnalyze => stage == Stage::Loaded,
        }
    }

    /// Get all intent kinds
    pub fn all() -> Vec<IntentKind> {
        vec![
            IntentKind::Upload,
            IntentKind::Configure,
            IntentKind::RefreshPreview,
            IntentKind::RunClean,
            IntentKind::RunAnalyze,
            IntentKind::OpenReport,
        ]
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a dispatched intent produced
#[derive(Debug, Clone, PartialEq)]
pub enum IntentOutcome {
    Preview(PreviewOutcome),
    Configured(CleaningConfig),
    Cleaned(CleanOutcome),
    Analyzed(AnalysisResult),
    ReportUrl(String),
}
