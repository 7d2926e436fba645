use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Column & Problem Typing
// ============================================================================

/// Semantic type of a dataset column, derived from its polars dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Datetime,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Datetime => "datetime",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of learning task implied by the target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    /// Discrete labels.
    #[default]
    Classification,
    /// Continuous target.
    Regression,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Classification => "classification",
            ProblemType::Regression => "regression",
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Profile Types
// ============================================================================

/// Summary statistics for one numeric column.
///
/// Every statistic is `None` when the column has no values; `std` is also
/// `None` when fewer than two values are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Value distribution of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub unique_count: usize,
    pub most_frequent: Option<String>,
    /// Up to ten `(value, count)` pairs, most frequent first.
    pub value_counts: Vec<(String, usize)>,
}

/// A column ranked by how well it would serve as a prediction target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCandidate {
    pub column: String,
    pub dtype: String,
    pub unique_values: usize,
    pub missing_values: usize,
    pub suitability_score: i32,
    pub reasons: Vec<String>,
}

/// Outcome of the data-quality scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Score in `[0, 100]`.
    pub score: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for QualityReport {
    fn default() -> Self {
        Self {
            score: 100.0,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Complete profile of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub column_types: BTreeMap<String, ColumnKind>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub datetime_columns: Vec<String>,
    pub total_missing: usize,
    pub missing_by_column: BTreeMap<String, usize>,
    pub missing_percent_by_column: BTreeMap<String, f64>,
    pub duplicate_rows: usize,
    pub numeric_summary: BTreeMap<String, NumericSummary>,
    pub categorical_summary: BTreeMap<String, CategoricalSummary>,
    pub quality_score: f64,
    pub quality_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub target_candidates: Vec<TargetCandidate>,
    /// Set when analysis failed; the other fields are then mostly empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatasetProfile {
    /// Build the degraded profile returned when analysis fails.
    pub fn failed(row_count: usize, column_count: usize, message: impl Into<String>) -> Self {
        Self {
            row_count,
            column_count,
            column_types: BTreeMap::new(),
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            datetime_columns: Vec::new(),
            total_missing: 0,
            missing_by_column: BTreeMap::new(),
            missing_percent_by_column: BTreeMap::new(),
            duplicate_rows: 0,
            numeric_summary: BTreeMap::new(),
            categorical_summary: BTreeMap::new(),
            quality_score: 0.0,
            quality_issues: Vec::new(),
            recommendations: Vec::new(),
            target_candidates: Vec::new(),
            error: Some(message.into()),
        }
    }

    /// True when the profile was produced without an analysis failure.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
