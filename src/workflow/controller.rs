use crate::core::{
    AnalysisResult, AnalyzeRequest, CleanOutcome, CleanReport, CleanRequest, CleaningConfig,
    ConfigPatch, DatasetId, DatasetSession, HealthStatus, OperationKind, PreviewOutcome,
    SessionView, Stage, UploadFile,
};
use crate::error::{ServiceError, WorkflowError, WorkflowResult};
use crate::services::DatasetService;
use crate::workflow::intent::{Intent, IntentOutcome};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Drives one `DatasetSession` through upload, preview, clean, analyze and
/// report against a `DatasetService`.
///
/// Every operation takes `&self`. The session lock is never held across a
/// service call, so a preview refresh can run while a clean or analyze is in
/// flight; stale preview responses are dropped by sequence number.
pub struct WorkflowController<S> {
    service: S,
    session: Mutex<DatasetSession>,
}

impl<S: DatasetService> WorkflowController<S> {
    /// Controller over a fresh, empty session
    pub fn new(service: S) -> Self {
        Self::with_session(service, DatasetSession::new())
    }

    pub fn with_session(service: S, session: DatasetSession) -> Self {
        Self {
            service,
            session: Mutex::new(session),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn session(&self) -> MutexGuard<'_, DatasetSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-only view for the presentation layer
    pub fn snapshot(&self) -> SessionView {
        self.session().snapshot()
    }

    /// Apply a partial config edit
    pub fn update_config(&self, patch: ConfigPatch) {
        self.session().set_config(patch);
    }

    pub fn config(&self) -> CleaningConfig {
        self.session().config().clone()
    }

    fn require_dataset(&self, operation: &str) -> WorkflowResult<DatasetId> {
        self.session().dataset_id().cloned().ok_or_else(|| {
            WorkflowError::invalid_state(format!("{operation} requires an uploaded dataset"))
        })
    }

    /// Upload a file and, once the service has assigned an id, refresh the
    /// preview. Only valid on an empty session.
    pub async fn upload(&self, file: &UploadFile) -> WorkflowResult<PreviewOutcome> {
        let session_id = {
            let mut session = self.session();
            session.transition(Stage::Uploading)?;
            session.id()
        };
        info!(session = %session_id, file = %file.file_name, "upload started");

        let dataset_id = match self.service.upload(file).await {
            Ok(id) => id,
            Err(e) => {
                warn!(session = %session_id, "upload failed: {e}");
                self.session().transition(Stage::Empty)?;
                return Err(WorkflowError::Upload(e));
            }
        };

        {
            let mut session = self.session();
            session.set_dataset_id(dataset_id.clone())?;
            session.transition(Stage::Loaded)?;
        }
        info!(session = %session_id, dataset = %dataset_id, "upload accepted");

        self.refresh_preview().await
    }

    /// Fetch the full current preview from the service.
    ///
    /// The result is installed only if no newer preview request was issued in
    /// the meantime; otherwise it is dropped and `Superseded` returned.
    pub async fn refresh_preview(&self) -> WorkflowResult<PreviewOutcome> {
        let dataset_id = self.require_dataset("preview")?;
        let ticket = self.session().begin(OperationKind::Preview);
        debug!(dataset = %dataset_id, seq = ticket.seq, "preview requested");

        let fetched = self.service.preview(&dataset_id).await;

        let mut session = self.session();
        if !session.is_latest(&ticket) {
            debug!(dataset = %dataset_id, seq = ticket.seq, "discarding stale preview response");
            return Ok(PreviewOutcome::Superseded);
        }

        let snapshot = fetched.map_err(|e| {
            warn!(dataset = %dataset_id, "preview fetch failed: {e}");
            WorkflowError::PreviewFetch(e)
        })?;
        let rows = snapshot.row_count;
        session.set_preview(snapshot).inspect_err(|e| {
            warn!(dataset = %dataset_id, "{e}");
        })?;
        info!(dataset = %dataset_id, rows, "preview updated");
        Ok(PreviewOutcome::Applied)
    }

    /// Ask the service to clean the dataset. Does not touch the preview;
    /// pair with `refresh_preview`, or use `run_clean`.
    ///
    /// Only the imputation and outlier methods are sent.
    pub async fn clean(&self, request: CleanRequest) -> WorkflowResult<CleanReport> {
        let dataset_id = self.require_dataset("clean")?;
        self.session().transition(Stage::Cleaning)?;
        info!(
            dataset = %dataset_id,
            imputation = %request.imputation_method,
            outliers = %request.outlier_method,
            "cleaning started"
        );

        let result = self.service.clean(&dataset_id, &request).await;
        self.session().transition(Stage::Loaded)?;

        let report = result.map_err(|e| {
            warn!(dataset = %dataset_id, "cleaning failed: {e}");
            WorkflowError::Clean(e)
        })?;
        info!(dataset = %dataset_id, log_lines = report.logs.len(), "cleaning finished");
        Ok(report)
    }

    /// Clean, then refetch the preview
    pub async fn run_clean(&self, request: CleanRequest) -> WorkflowResult<CleanOutcome> {
        let report = self.clean(request).await?;
        let preview = self.refresh_preview().await?;
        Ok(CleanOutcome { report, preview })
    }

    /// Run analysis with `weight_column`, where `""` means unweighted.
    ///
    /// The column is not checked against the preview; an unknown column is
    /// for the service to reject.
    pub async fn run_analyze(&self, weight_column: &str) -> WorkflowResult<AnalysisResult> {
        let dataset_id = self.require_dataset("analyze")?;
        self.session().transition(Stage::Analyzing)?;
        let request = AnalyzeRequest::for_weight_column(weight_column);
        info!(dataset = %dataset_id, weight = ?request.weight_column, "analysis started");

        let result = self.service.analyze(&dataset_id, &request).await;
        self.session().transition(Stage::Loaded)?;

        result.map_err(|e| {
            warn!(dataset = %dataset_id, "analysis failed: {e}");
            WorkflowError::Analyze(e)
        })
    }

    /// Report location for the current dataset. No request is made and the
    /// session is not touched.
    pub fn report_url(&self) -> WorkflowResult<String> {
        let dataset_id = self.require_dataset("report")?;
        self.service
            .report_url(&dataset_id)
            .map_err(WorkflowError::Report)
    }

    /// Check that the service is up
    pub async fn ping(&self) -> Result<HealthStatus, ServiceError> {
        self.service.health().await
    }

    /// Route a user intent to the matching operation
    pub async fn dispatch(&self, intent: Intent) -> WorkflowResult<IntentOutcome> {
        debug!("dispatching {}", intent.name());
        match intent {
            Intent::Upload(file) => self.upload(&file).await.map(IntentOutcome::Preview),
            Intent::Configure(patch) => {
                self.update_config(patch);
                Ok(IntentOutcome::Configured(self.config()))
            }
            Intent::RefreshPreview => self.refresh_preview().await.map(IntentOutcome::Preview),
            Intent::RunClean => {
                let request = self.config().clean_request();
                self.run_clean(request).await.map(IntentOutcome::Cleaned)
            }
            Intent::RunAnalyze => {
                let config = self.config();
                self.run_analyze(config.weight_column_str())
                    .await
                    .map(IntentOutcome::Analyzed)
            }
            Intent::OpenReport => self.report_url().map(IntentOutcome::ReportUrl),
        }
    }
}
