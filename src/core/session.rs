use crate::core::models::{CleaningConfig, ConfigPatch, PreviewSnapshot, SessionView};
use crate::core::types::{DatasetId, OperationKind, SessionId, Stage};
use crate::error::{WorkflowError, WorkflowResult};
use std::collections::HashMap;
use tracing::{debug, info};

/// Handle for one issued request, compared on response to spot stale replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub kind: OperationKind,
    pub seq: u64,
}

/// Monotonic per-operation request counters
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    issued: HashMap<OperationKind, u64>,
}

impl RequestSequencer {
    pub fn begin(&mut self, kind: OperationKind) -> RequestTicket {
        let seq = self.issued.entry(kind).or_insert(0);
        *seq += 1;
        RequestTicket { kind, seq: *seq }
    }

    /// True when no newer request of the same kind was issued since `ticket`
    pub fn is_latest(&self, ticket: &RequestTicket) -> bool {
        self.issued.get(&ticket.kind).copied() == Some(ticket.seq)
    }

    pub fn issued(&self, kind: OperationKind) -> u64 {
        self.issued.get(&kind).copied().unwrap_or(0)
    }
}

/// Working state for one dataset.
///
/// The session maps to exactly one dataset: once the id is set it never
/// changes. The preview is only ever swapped whole.
#[derive(Debug, Clone, Default)]
pub struct DatasetSession {
    id: SessionId,
    dataset_id: Option<DatasetId>,
    config: CleaningConfig,
    preview: Option<PreviewSnapshot>,
    stage: Stage,
    sequencer: RequestSequencer,
}

impl DatasetSession {
    /// A fresh session with no file chosen
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a non-default configuration
    pub fn with_config(config: CleaningConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Session for a dataset uploaded earlier; starts Loaded without a preview
    pub fn attached(dataset_id: DatasetId) -> Self {
        Self {
            dataset_id: Some(dataset_id),
            stage: Stage::Loaded,
            ..Self::default()
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn dataset_id(&self) -> Option<&DatasetId> {
        self.dataset_id.as_ref()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    pub fn preview(&self) -> Option<&PreviewSnapshot> {
        self.preview.as_ref()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn sequencer(&self) -> &RequestSequencer {
        &self.sequencer
    }

    /// Assign the service-provided id; a session accepts exactly one
    pub fn set_dataset_id(&mut self, id: DatasetId) -> WorkflowResult<()> {
        if let Some(existing) = &self.dataset_id {
            return Err(WorkflowError::invalid_state(format!(
                "session already bound to dataset {existing}"
            )));
        }
        debug!(session = %self.id, dataset = %id, "dataset id assigned");
        self.dataset_id = Some(id);
        Ok(())
    }

    /// Merge a partial config. Column names are not checked here.
    pub fn set_config(&mut self, patch: ConfigPatch) {
        self.config.apply(patch);
    }

    /// Install a new preview, or keep the old one if the snapshot is inconsistent
    pub fn set_preview(&mut self, snapshot: PreviewSnapshot) -> WorkflowResult<()> {
        snapshot.validate().map_err(WorkflowError::InvalidPreview)?;
        self.preview = Some(snapshot);
        Ok(())
    }

    /// Move to `target`, refusing edges the workflow does not have
    pub fn transition(&mut self, target: Stage) -> WorkflowResult<()> {
        if !self.stage.can_transition_to(target) {
            return Err(WorkflowError::invalid_state(format!(
                "cannot move from {} to {}",
                self.stage, target
            )));
        }
        if target.has_dataset() && self.dataset_id.is_none() {
            return Err(WorkflowError::invalid_state(format!(
                "{target} requires a dataset id"
            )));
        }
        info!(session = %self.id, from = %self.stage, to = %target, "stage change");
        self.stage = target;
        Ok(())
    }

    pub fn begin(&mut self, kind: OperationKind) -> RequestTicket {
        self.sequencer.begin(kind)
    }

    pub fn is_latest(&self, ticket: &RequestTicket) -> bool {
        self.sequencer.is_latest(ticket)
    }

    /// Immutable copy for rendering
    pub fn snapshot(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            dataset_id: self.dataset_id.clone(),
            config: self.config.clone(),
            preview: self.preview.clone(),
            stage: self.stage,
        }
    }
}
