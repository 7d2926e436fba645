//! Training and evaluation of a set of models on one dataset.
//!
//! [`train_and_evaluate`] resolves the problem type, preprocesses the
//! features, splits the rows once and then fits every requested model on the
//! same split. Request problems (unknown names, missing target, empty data)
//! abort the call. Anything that goes wrong inside one model, a backend
//! panic included, becomes an error-status [`TrainingResult`] and the batch
//! carries on.
//!
//! # Example
//!
//! ```rust,ignore
//! use modelpick_engine::{TrainingConfig, train_and_evaluate};
//!
//! let run = train_and_evaluate(&df, "price", &["random_forest", "linear_regression"], &TrainingConfig::default())?;
//! for result in &run.results {
//!     println!("{}: {:?}", result.model_name, result.metrics.get("r2_score"));
//! }
//! ```

use crate::config::TrainingConfig;
use crate::error::{EngineError, ModelError, Result};
use crate::metrics::{
    Diagnostics, MetricMap, classification_diagnostics, classification_metrics,
    regression_diagnostics, regression_metrics,
};
use crate::models::{self, Estimator, Predictions, importance_map};
use crate::registry::{ModelSpec, available_names, lookup};
use chrono::{DateTime, Utc};
use modelpick_data::utils::get_series;
use modelpick_data::{
    DataError, FeatureMatrix, FeaturePreprocessor, ProblemType, TargetValues, classify,
};
use polars::prelude::DataFrame;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Datasets smaller than this get their test fraction raised so the test
/// split is never empty.
pub const SMALL_DATASET_ROWS: usize = 10;

/// Outcome of one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Result of training and evaluating one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingResult {
    pub model_name: String,
    pub status: ResultStatus,

    /// Wall-clock fit time. Prediction and scoring are not included.
    pub training_time_seconds: f64,

    /// Metric values; every value is finite or `null`.
    pub metrics: MetricMap,

    /// Per-column importance; empty when the model exposes none.
    pub feature_importance: BTreeMap<String, f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TrainingResult {
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Value of `key`, if present and not null.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied().flatten()
    }

    fn failed(model_name: &str, training_time_seconds: f64, error: &ModelError) -> Self {
        Self {
            model_name: model_name.to_string(),
            status: ResultStatus::Error,
            training_time_seconds,
            metrics: MetricMap::new(),
            feature_importance: BTreeMap::new(),
            diagnostics: None,
            error_message: Some(error.to_string()),
        }
    }
}

/// Rows and feature columns of one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataShape {
    pub rows: usize,
    pub columns: usize,
}

/// Everything produced by one [`train_and_evaluate`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingRun {
    pub problem_type: ProblemType,

    /// One result per distinct requested model, in request order.
    pub results: Vec<TrainingResult>,

    pub train_shape: DataShape,
    pub test_shape: DataShape,

    /// Test fraction actually used.
    pub effective_test_size: f64,

    /// Set when a small dataset forced a larger test fraction.
    pub test_size_adjusted: bool,

    /// Non-fatal remarks about the data or the split.
    pub notes: Vec<String>,

    pub timestamp: DateTime<Utc>,
}

impl TrainingRun {
    /// Result for `model_name`, if it was trained.
    pub fn result(&self, model_name: &str) -> Option<&TrainingResult> {
        self.results.iter().find(|r| r.model_name == model_name)
    }
}

/// Train every model in `model_names` on `df` and evaluate it on a held-out
/// split.
///
/// # Errors
///
/// Returns an [`EngineError`] for request-level problems: invalid config,
/// empty model list, empty dataset, missing target column, unknown model
/// names, no feature columns or fewer than two usable rows. Failures of
/// individual models are reported inside the returned [`TrainingRun`].
pub fn train_and_evaluate<S: AsRef<str>>(
    df: &DataFrame,
    target: &str,
    model_names: &[S],
    config: &TrainingConfig,
) -> Result<TrainingRun> {
    train_as(df, target, model_names, config, None)
}

/// [`train_and_evaluate`] with the problem type fixed by the caller instead
/// of inferred from the target.
pub(crate) fn train_as<S: AsRef<str>>(
    df: &DataFrame,
    target: &str,
    model_names: &[S],
    config: &TrainingConfig,
    problem_type: Option<ProblemType>,
) -> Result<TrainingRun> {
    config.validate()?;
    if model_names.is_empty() {
        return Err(EngineError::EmptyModelList);
    }
    if df.height() == 0 {
        return Err(DataError::EmptyDataset.into());
    }

    let problem_type = match problem_type {
        Some(problem_type) => {
            // still reports a missing target column
            get_series(df, target)?;
            problem_type
        }
        None => classify(df, target)?,
    };
    let specs = resolve_models(model_names, problem_type)?;

    let prepared = FeaturePreprocessor::preprocess(df, target, problem_type)?;
    let n_rows = prepared.features.n_rows();
    if n_rows < 2 {
        return Err(EngineError::NotEnoughRows(n_rows));
    }

    let mut notes = Vec::new();
    if prepared.dropped_target_rows > 0 {
        notes.push(format!(
            "Dropped {} rows with a missing value in '{target}'",
            prepared.dropped_target_rows
        ));
    }
    if !prepared.imputed_columns.is_empty() {
        notes.push(format!(
            "Filled missing values with the column mean in: {}",
            prepared.imputed_columns.join(", ")
        ));
    }

    let split = Split::new(n_rows, config.test_size, config.seed());
    if split.adjusted {
        notes.push(format!(
            "Test size raised to {:.3} for a dataset of {n_rows} rows",
            split.test_size
        ));
    }

    let train_x = prepared.features.select_rows(&split.train);
    let test_x = prepared.features.select_rows(&split.test);
    let train_y = prepared.target.select(&split.train);
    let test_y = prepared.target.select(&split.test);

    info!(
        target_column = target,
        problem_type = %problem_type,
        models = specs.len(),
        train_rows = train_x.n_rows(),
        test_rows = test_x.n_rows(),
        "Starting training batch"
    );

    let data = SplitData {
        train_x: &train_x,
        train_y: &train_y,
        test_x: &test_x,
        test_y: &test_y,
    };
    let results: Vec<TrainingResult> = specs
        .iter()
        .map(|spec| {
            let model = models::build(spec, config.seed());
            evaluate_model(model, &data, config.max_fit_seconds)
        })
        .collect();

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    info!(
        succeeded,
        failed = results.len() - succeeded,
        "Training batch finished"
    );

    let n_cols = prepared.features.n_cols();
    Ok(TrainingRun {
        problem_type,
        results,
        train_shape: DataShape {
            rows: train_x.n_rows(),
            columns: n_cols,
        },
        test_shape: DataShape {
            rows: test_x.n_rows(),
            columns: n_cols,
        },
        effective_test_size: split.test_size,
        test_size_adjusted: split.adjusted,
        notes,
        timestamp: Utc::now(),
    })
}

/// Registry entries for the requested names, deduplicated in request order.
fn resolve_models<S: AsRef<str>>(
    model_names: &[S],
    problem_type: ProblemType,
) -> Result<Vec<&'static ModelSpec>> {
    let mut seen = HashSet::new();
    let mut specs = Vec::new();
    let mut invalid = Vec::new();
    for name in model_names.iter().map(AsRef::as_ref) {
        if !seen.insert(name) {
            continue;
        }
        match lookup(name, problem_type) {
            Some(spec) => specs.push(spec),
            None => invalid.push(name.to_string()),
        }
    }
    if !invalid.is_empty() {
        return Err(EngineError::UnknownModels {
            invalid,
            available: available_names(problem_type),
            problem_type,
        });
    }
    Ok(specs)
}

// ============================================================================
// Split
// ============================================================================

/// Shuffled train/test row indices.
#[derive(Debug, Clone, PartialEq)]
struct Split {
    train: Vec<usize>,
    test: Vec<usize>,
    test_size: f64,
    adjusted: bool,
}

impl Split {
    fn new(n_rows: usize, test_size: f64, seed: u64) -> Self {
        let mut effective = test_size;
        let mut adjusted = false;
        if n_rows < SMALL_DATASET_ROWS {
            let minimum = 1.0 / n_rows as f64;
            if effective < minimum {
                effective = minimum;
                adjusted = true;
            }
        }

        // the epsilon keeps 0.3 * 10 from rounding up to 4
        let raw = (effective * n_rows as f64 - 1e-9).ceil() as usize;
        let n_test = raw.clamp(1, n_rows - 1);

        let mut indices: Vec<usize> = (0..n_rows).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));
        let train = indices.split_off(n_test);

        Self {
            train,
            test: indices,
            test_size: effective,
            adjusted,
        }
    }
}

// ============================================================================
// Per-model evaluation
// ============================================================================

struct SplitData<'a> {
    train_x: &'a FeatureMatrix,
    train_y: &'a TargetValues,
    test_x: &'a FeatureMatrix,
    test_y: &'a TargetValues,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, turning a panic into [`ModelError::Panicked`].
fn guarded<T>(
    model: &str,
    f: impl FnOnce() -> std::result::Result<T, ModelError>,
) -> std::result::Result<T, ModelError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(ModelError::Panicked {
            model: model.to_string(),
            reason: panic_message(payload),
        })
    })
}

fn evaluate_model(
    mut model: Box<dyn Estimator>,
    data: &SplitData<'_>,
    max_fit_seconds: Option<f64>,
) -> TrainingResult {
    let name = model.name();
    debug!(model = name, "Fitting model");

    let start = Instant::now();
    let fitted = guarded(name, || model.fit(data.train_x, data.train_y));
    let elapsed = start.elapsed().as_secs_f64();

    let outcome = fitted
        .and_then(|()| check_budget(name, elapsed, max_fit_seconds))
        .and_then(|()| score(model.as_ref(), data));

    match outcome {
        Ok((metrics, diagnostics)) => {
            debug!(model = name, seconds = elapsed, "Model evaluated");
            let importance =
                match guarded(name, || model.importance(data.train_x, data.train_y)) {
                    Ok(importance) => importance,
                    Err(e) => {
                        warn!(model = name, error = %e, "Feature importance unavailable");
                        None
                    }
                };
            TrainingResult {
                model_name: name.to_string(),
                status: ResultStatus::Success,
                training_time_seconds: elapsed,
                metrics,
                feature_importance: importance_map(importance, &data.train_x.columns),
                diagnostics: Some(diagnostics),
                error_message: None,
            }
        }
        Err(e) => {
            warn!(model = name, error = %e, "Model failed");
            TrainingResult::failed(name, elapsed, &e)
        }
    }
}

fn check_budget(
    model: &str,
    elapsed: f64,
    limit: Option<f64>,
) -> std::result::Result<(), ModelError> {
    match limit {
        Some(limit) if elapsed > limit => Err(ModelError::TimeBudgetExceeded {
            model: model.to_string(),
            limit_secs: limit,
            elapsed_secs: elapsed,
        }),
        _ => Ok(()),
    }
}

fn score(
    model: &dyn Estimator,
    data: &SplitData<'_>,
) -> std::result::Result<(MetricMap, Diagnostics), ModelError> {
    let name = model.name();
    let train_pred = guarded(name, || model.predict(data.train_x))?;
    let test_pred = guarded(name, || model.predict(data.test_x))?;
    if train_pred.len() != data.train_x.n_rows() || test_pred.len() != data.test_x.n_rows() {
        return Err(ModelError::predict(name, "prediction count does not match row count"));
    }

    match (data.train_y, data.test_y, &train_pred, &test_pred) {
        (
            TargetValues::Classes {
                labels: train_truth,
                ..
            },
            TargetValues::Classes {
                labels: test_truth,
                names,
            },
            Predictions::Classes(train_pred),
            Predictions::Classes(test_pred),
        ) => {
            let scores = guarded(name, || model.class_scores(data.test_x))?
                .filter(|s| s.rows.len() == test_truth.len());
            Ok((
                classification_metrics(train_truth, train_pred, test_truth, test_pred),
                classification_diagnostics(names, test_truth, test_pred, scores.as_ref()),
            ))
        }
        (
            TargetValues::Continuous {
                values: train_truth,
            },
            TargetValues::Continuous { values: test_truth },
            Predictions::Values(train_pred),
            Predictions::Values(test_pred),
        ) => Ok((
            regression_metrics(train_truth, train_pred, test_truth, test_pred),
            regression_diagnostics(test_truth, test_pred),
        )),
        _ => Err(ModelError::predict(
            name,
            "prediction kind does not match the target",
        )),
    }
}

static_assertions::assert_impl_all!(TrainingRun: Send, Sync);
static_assertions::assert_impl_all!(TrainingResult: Send, Sync);
