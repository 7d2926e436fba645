//! Custom error types for dataset analysis and preprocessing.
//!
//! This module provides the error hierarchy for the data crate using
//! `thiserror`. Errors are serializable so that a calling layer (an HTTP
//! handler, a CLI printing JSON) can forward them as `{code, message}`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for dataset operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Column was not found in the dataset.
    #[error("Column '{column}' not found. Available: {}", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// The dataset has no rows.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// The dataset has no columns left once the target is removed.
    #[error("Dataset has no feature columns besides target '{0}'")]
    NoFeatureColumns(String),

    /// Type conversion failed.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// Data profiling failed.
    #[error("Failed to profile dataset: {0}")]
    ProfilingFailed(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DataError>,
    },
}

impl DataError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DataError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Columns the frame does have, when a column lookup failed.
    pub fn available_columns(&self) -> Option<&[String]> {
        match self {
            Self::ColumnNotFound { available, .. } => Some(available),
            Self::WithContext { source, .. } => source.available_columns(),
            _ => None,
        }
    }

    /// Get a stable error code for callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::NoFeatureColumns(_) => "NO_FEATURE_COLUMNS",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::ProfilingFailed(_) => "PROFILING_FAILED",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by the caller's request rather than the data engine.
    pub fn is_request_error(&self) -> bool {
        match self {
            Self::ColumnNotFound { .. }
            | Self::EmptyDataset
            | Self::NoValidValues(_)
            | Self::NoFeatureColumns(_) => true,
            Self::WithContext { source, .. } => source.is_request_error(),
            _ => false,
        }
    }
}

impl Serialize for DataError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let available = self.available_columns();
        let fields = if available.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("DataError", fields)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        if let Some(available) = available {
            state.serialize_field("available", available)?;
        }
        state.end()
    }
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| DataError::Polars(e).with_context(context))
    }
}
