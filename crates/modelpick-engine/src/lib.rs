//! Automated model comparison for tabular data.
//!
//! Given a dataset and a target column, the engine infers the problem type,
//! fits every requested model on the same train/test split, ranks the
//! results and explains the outcome.
//!
//! # Features
//!
//! - **Model registry**: a closed set of classification and regression
//!   models ([`registry`])
//! - **Training pipeline**: one split, per-model failure isolation,
//!   metrics, diagnostics and feature importance ([`train_and_evaluate`])
//! - **Ranking**: primary-metric ranking and comparative insights ([`rank`])
//! - **Reports**: strengths and weaknesses of a single model
//!   ([`model_report`])
//! - **Suggestions**: top models from a comparison run, with an optional
//!   LLM advisory ([`SuggestionEngine`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use modelpick_engine::{TrainingConfig, rank, train_and_evaluate};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("housing.csv".into()))?
//!     .finish()?;
//!
//! let run = train_and_evaluate(
//!     &df,
//!     "price",
//!     &["random_forest", "linear_regression", "xgboost"],
//!     &TrainingConfig::default(),
//! )?;
//! let report = rank(&run.results, run.problem_type);
//! println!("Best model: {:?}", report.best_model);
//! for insight in &report.insights {
//!     println!("- {insight}");
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `ai` (default): the HTTP advisory provider in [`ai`]

pub mod ai;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod registry;
pub mod report;
pub mod suggestion;

pub use config::{TrainingConfig, TrainingConfigBuilder};
pub use error::{EngineError, ModelError, Result};
pub use metrics::{
    ClassProbabilities, ClassReport, Diagnostics, MetricMap, SummaryStats, finite_or_null,
};
pub use models::{Estimator, Importance, Predictions};
pub use pipeline::{DataShape, ResultStatus, TrainingResult, TrainingRun, train_and_evaluate};
pub use ranking::{ComparisonReport, RankedModel, primary_metric, rank};
pub use registry::{ModelKind, ModelSpec, available_names, lookup, models_for};
pub use report::{FeatureScore, ModelReport, model_report};
pub use suggestion::{
    DEFAULT_ADVISORY_TIMEOUT, SuggestionEngine, SuggestionPayload, SuggestionSource,
};

// Re-export the data crate for convenience
pub use modelpick_data;

static_assertions::assert_impl_all!(ComparisonReport: Send, Sync);
static_assertions::assert_impl_all!(SuggestionPayload: Send, Sync);
static_assertions::assert_impl_all!(SuggestionEngine: Send, Sync);
