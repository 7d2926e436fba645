//! Error types for the training engine.
//!
//! [`EngineError`] covers request-level failures that abort a whole call.
//! [`ModelError`] covers failures confined to one model; the pipeline turns
//! those into an error-status result instead of propagating them.

use modelpick_data::{DataError, ProblemType};
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Request-level error for engine entry points.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Dataset-level failure (empty data, missing column, no features).
    #[error(transparent)]
    Data(#[from] DataError),

    /// One or more requested model names are not registered for the problem type.
    #[error(
        "Unknown model(s) for {problem_type}: {}. Available: {}",
        .invalid.join(", "),
        .available.join(", ")
    )]
    UnknownModels {
        invalid: Vec<String>,
        available: Vec<String>,
        problem_type: ProblemType,
    },

    /// No model names were requested.
    #[error("No models requested")]
    EmptyModelList,

    /// Too few usable rows to hold out a test split.
    #[error("Need at least 2 rows with a target value to train, got {0}")]
    NotEnoughRows(usize),

    /// The training configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Get a stable error code for callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Data(e) => e.error_code(),
            Self::UnknownModels { .. } => "UNKNOWN_MODELS",
            Self::EmptyModelList => "EMPTY_MODEL_LIST",
            Self::NotEnoughRows(_) => "NOT_ENOUGH_ROWS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

impl Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let missing_columns = match self {
            Self::Data(e) => e.available_columns(),
            _ => None,
        };
        let fields = match (self, missing_columns) {
            (Self::UnknownModels { .. }, _) => 4,
            (_, Some(_)) => 3,
            _ => 2,
        };
        let mut state = serializer.serialize_struct("EngineError", fields)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        if let Self::UnknownModels {
            invalid, available, ..
        } = self
        {
            state.serialize_field("invalid", invalid)?;
            state.serialize_field("available", available)?;
        }
        if let Some(available) = missing_columns {
            state.serialize_field("available", available)?;
        }
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure of a single model's fit, predict, or evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{model} failed to fit: {reason}")]
    Fit { model: String, reason: String },

    #[error("{model} failed to predict: {reason}")]
    Predict { model: String, reason: String },

    #[error("{model} cannot be trained on this data: {reason}")]
    InvalidInput { model: String, reason: String },

    #[error("{model} panicked: {reason}")]
    Panicked { model: String, reason: String },

    #[error("{model} was used before fit")]
    NotFitted { model: String },

    #[error("{model} exceeded the {limit_secs:.1}s fit budget ({elapsed_secs:.1}s)")]
    TimeBudgetExceeded {
        model: String,
        limit_secs: f64,
        elapsed_secs: f64,
    },
}

impl ModelError {
    pub fn fit(model: &str, reason: impl ToString) -> Self {
        Self::Fit {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn predict(model: &str, reason: impl ToString) -> Self {
        Self::Predict {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_input(model: &str, reason: impl ToString) -> Self {
        Self::InvalidInput {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }
}
