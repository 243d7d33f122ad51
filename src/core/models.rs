use crate::core::types::{DatasetId, ImputationMethod, OutlierMethod, SessionId, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// A single cell as the service reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One preview row, keyed by column name
pub type Row = BTreeMap<String, CellValue>;

/// A bounded sample of the dataset plus its full dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: u64,
    pub column_count: u64,
}

impl PreviewSnapshot {
    /// Check that columns, rows and counts describe the same table
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(format!("duplicate column '{column}'"));
            }
        }

        if self.column_count != self.columns.len() as u64 {
            return Err(format!(
                "column_count is {} but {} columns were listed",
                self.column_count,
                self.columns.len()
            ));
        }

        if self.rows.len() as u64 > self.row_count {
            return Err(format!(
                "{} sample rows exceed row_count {}",
                self.rows.len(),
                self.row_count
            ));
        }

        for (idx, row) in self.rows.iter().enumerate() {
            if let Some(unknown) = row.keys().find(|k| !seen.contains(k.as_str())) {
                return Err(format!("row {idx} has unknown column '{unknown}'"));
            }
        }

        Ok(())
    }

    /// Cell at (row, column) if present
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Cleaning and analysis settings held by a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningConfig {
    #[serde(default)]
    pub imputation_method: ImputationMethod,
    #[serde(default)]
    pub outlier_method: OutlierMethod,
    #[serde(default)]
    pub weight_column: Option<String>,
}

impl CleaningConfig {
    /// Merge a partial update; every field present in the patch wins
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(method) = patch.imputation_method {
            self.imputation_method = method;
        }
        if let Some(method) = patch.outlier_method {
            self.outlier_method = method;
        }
        if let Some(weight) = patch.weight_column {
            self.weight_column = weight.filter(|w| !w.is_empty());
        }
    }

    /// The part of the config the clean endpoint takes
    pub fn clean_request(&self) -> CleanRequest {
        CleanRequest {
            imputation_method: self.imputation_method,
            outlier_method: self.outlier_method,
        }
    }

    /// Weight column as the analyze operation takes it, `""` meaning none
    pub fn weight_column_str(&self) -> &str {
        self.weight_column.as_deref().unwrap_or("")
    }
}

/// Partial configuration update.
///
/// `weight_column: Some(None)` clears the weight column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub imputation_method: Option<ImputationMethod>,
    pub outlier_method: Option<OutlierMethod>,
    pub weight_column: Option<Option<String>>,
}

impl ConfigPatch {
    pub fn imputation(method: ImputationMethod) -> Self {
        Self {
            imputation_method: Some(method),
            ..Default::default()
        }
    }

    pub fn outliers(method: OutlierMethod) -> Self {
        Self {
            outlier_method: Some(method),
            ..Default::default()
        }
    }

    pub fn weight(column: Option<String>) -> Self {
        Self {
            weight_column: Some(column),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imputation_method.is_none()
            && self.outlier_method.is_none()
            && self.weight_column.is_none()
    }
}

/// Body of `POST /datasets/{id}/clean`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRequest {
    pub imputation_method: ImputationMethod,
    pub outlier_method: OutlierMethod,
}

/// Body of `POST /datasets/{id}/analyze`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub weight_column: Option<String>,
}

impl AnalyzeRequest {
    /// An empty column name is sent as an explicit `null`
    pub fn for_weight_column(weight_column: &str) -> Self {
        Self {
            weight_column: (!weight_column.is_empty()).then(|| weight_column.to_string()),
        }
    }
}

/// What the clean endpoint reports besides success
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Analysis output. Opaque to the controller; the accessors only read
/// fields the service documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(pub Value);

impl AnalysisResult {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Rows the analysis ran over
    pub fn n(&self) -> Option<u64> {
        self.0.get("n").and_then(Value::as_u64)
    }

    /// Kish effective sample size
    pub fn effective_n(&self) -> Option<f64> {
        self.0.get("effective_n").and_then(Value::as_f64)
    }

    /// Weight column the service actually applied
    pub fn weight_column(&self) -> Option<&str> {
        self.0.get("weight_column").and_then(Value::as_str)
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.summary_keys("numeric")
    }

    pub fn categorical_columns(&self) -> Vec<&str> {
        self.summary_keys("categorical")
    }

    fn summary_keys(&self, section: &str) -> Vec<&str> {
        self.0
            .get(section)
            .and_then(Value::as_object)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Service liveness as reported by `GET /`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Read-only copy of a session handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub dataset_id: Option<DatasetId>,
    pub config: CleaningConfig,
    pub preview: Option<PreviewSnapshot>,
    pub stage: Stage,
}

/// Whether a preview response made it into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    Applied,
    /// A newer preview request was issued while this one was in flight
    Superseded,
}

/// Result of the two-step clean command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOutcome {
    pub report: CleanReport,
    pub preview: PreviewOutcome,
}
