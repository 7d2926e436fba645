//! Model recommendations for a dataset and target column.
//!
//! [`SuggestionEngine::suggest`] runs every registered model for the problem
//! type through a fixed comparison split (30% test, seed 42), ranks them and
//! recommends the top three. An [`AdvisoryProvider`], when configured, is
//! queried on a worker thread while the comparison runs; its answer is
//! returned alongside the ranking and never replaces it. An answer that
//! arrives after [`DEFAULT_ADVISORY_TIMEOUT`] (or the engine's configured
//! timeout) is dropped. When no model trains successfully a fixed fallback
//! list is returned instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use modelpick_data::DataProfiler;
//! use modelpick_engine::SuggestionEngine;
//!
//! let profile = DataProfiler::profile(&df);
//! let payload = SuggestionEngine::new().suggest(&df, &profile, "species", None)?;
//! println!("{:?} ({})", payload.recommended_models, payload.source);
//! ```

use crate::ai::{Advisory, AdvisoryProvider, DataSummary};
use crate::config::{DEFAULT_RANDOM_STATE, TrainingConfig};
use crate::error::Result;
use crate::pipeline::train_as;
use crate::ranking::{ComparisonReport, rank};
use crate::registry::available_names;
use modelpick_data::utils::{get_series, unique_count};
use modelpick_data::{DatasetProfile, ProblemType, classify};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Test fraction of the comparison run.
pub const COMPARISON_TEST_SIZE: f64 = 0.3;

/// Number of models recommended.
pub const TOP_N: usize = 3;

/// How long `suggest` waits for the advisory, counted from the start of
/// the call.
pub const DEFAULT_ADVISORY_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the payload's `reasoning` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Advisory,
    Performance,
    Fallback,
}

impl fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuggestionSource::Advisory => "advisory",
            SuggestionSource::Performance => "performance",
            SuggestionSource::Fallback => "fallback",
        };
        write!(f, "{s}")
    }
}

/// Result of [`SuggestionEngine::suggest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SuggestionPayload {
    pub problem_type: ProblemType,
    pub data_summary: DataSummary,
    pub comparison: ComparisonReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
    /// Ranking summary derived from the comparison run; empty when nothing
    /// trained.
    pub performance_explanation: String,
    /// Top of the ranking, or the fallback list when the ranking is empty.
    pub recommended_models: Vec<String>,
    pub reasoning: String,
    pub source: SuggestionSource,
}

/// Recommends models from a comparison run plus an optional advisory.
#[derive(Clone)]
pub struct SuggestionEngine {
    provider: Option<Arc<dyn AdvisoryProvider>>,
    advisory_timeout: Duration,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self {
            provider: None,
            advisory_timeout: DEFAULT_ADVISORY_TIMEOUT,
        }
    }
}

impl fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuggestionEngine")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("advisory_timeout", &self.advisory_timeout)
            .finish()
    }
}

impl SuggestionEngine {
    /// Engine without an advisory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that also consults `provider`.
    pub fn with_provider(provider: Arc<dyn AdvisoryProvider>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }

    /// Replace the advisory deadline.
    #[must_use]
    pub fn with_advisory_timeout(mut self, timeout: Duration) -> Self {
        self.advisory_timeout = timeout;
        self
    }

    /// Start the advisory request on a detached worker. The worker outlives
    /// a missed deadline; its late answer is discarded with the channel.
    fn request_advisory(
        &self,
        summary: &DataSummary,
    ) -> Option<mpsc::Receiver<anyhow::Result<Advisory>>> {
        let provider = Arc::clone(self.provider.as_ref()?);
        let summary = summary.clone();
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("advisory".to_string())
            .spawn(move || {
                let _ = tx.send(provider.recommend(&summary));
            });
        match spawned {
            Ok(_) => Some(rx),
            Err(e) => {
                warn!(error = %e, "Could not start advisory worker");
                None
            }
        }
    }

    /// Engine using the chat-completions provider when `OPENAI_API_KEY` is
    /// set, and no advisory otherwise.
    #[cfg(feature = "ai")]
    pub fn from_env() -> Self {
        match crate::ai::ChatCompletionsProvider::from_env() {
            Ok(Some(provider)) => Self::with_provider(Arc::new(provider)),
            Ok(None) => Self::new(),
            Err(e) => {
                warn!(error = %e, "Advisory provider unavailable");
                Self::new()
            }
        }
    }

    /// Recommend models for predicting `target` in `df`.
    ///
    /// `problem_type` overrides the inferred type when given.
    ///
    /// # Errors
    ///
    /// Returns a request-level [`EngineError`](crate::EngineError) when the
    /// comparison run cannot start (missing target, empty data, no features,
    /// too few rows). Advisory failures are never errors.
    pub fn suggest(
        &self,
        df: &DataFrame,
        profile: &DatasetProfile,
        target: &str,
        problem_type: Option<ProblemType>,
    ) -> Result<SuggestionPayload> {
        let problem_type = match problem_type {
            Some(problem_type) => problem_type,
            None => classify(df, target)?,
        };
        let data_summary = summarize(df, profile, target, problem_type)?;

        let config = TrainingConfig {
            test_size: COMPARISON_TEST_SIZE,
            random_state: DEFAULT_RANDOM_STATE,
            max_fit_seconds: None,
        };
        let models = available_names(problem_type);

        let deadline = Instant::now() + self.advisory_timeout;
        let pending = self.request_advisory(&data_summary);
        let run = train_as(df, target, &models, &config, Some(problem_type));
        let advisory = pending.and_then(|rx| {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(Ok(advisory)) => Some(advisory),
                Ok(Err(e)) => {
                    warn!(error = %e, "Advisory unavailable, using performance ranking");
                    None
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        timeout_secs = self.advisory_timeout.as_secs_f64(),
                        "Advisory timed out, using performance ranking"
                    );
                    None
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Advisory provider panicked, using performance ranking");
                    None
                }
            }
        });
        let comparison = rank(&run?.results, problem_type);

        let performance_explanation = explain_performance(&comparison);
        let (recommended_models, mut reasoning, mut source) = if comparison.ranking.is_empty() {
            let (models, reasoning) = fallback(problem_type);
            (models, reasoning.to_string(), SuggestionSource::Fallback)
        } else {
            (
                comparison.top(TOP_N),
                performance_explanation.clone(),
                SuggestionSource::Performance,
            )
        };
        if let Some(advisory) = &advisory
            && !advisory.reasoning.is_empty()
        {
            reasoning = advisory.reasoning.clone();
            source = SuggestionSource::Advisory;
        }

        info!(
            problem_type = %problem_type,
            recommended = ?recommended_models,
            source = %source,
            "Suggestions ready"
        );

        Ok(SuggestionPayload {
            problem_type,
            data_summary,
            comparison,
            advisory,
            performance_explanation,
            recommended_models,
            reasoning,
            source,
        })
    }
}

/// Dataset facts for the advisory prompt.
pub fn summarize(
    df: &DataFrame,
    profile: &DatasetProfile,
    target: &str,
    problem_type: ProblemType,
) -> Result<DataSummary> {
    let series = get_series(df, target)?;
    Ok(DataSummary {
        shape: [profile.row_count, profile.column_count],
        target_column: target.to_string(),
        target_type: series.dtype().to_string(),
        target_unique_values: unique_count(series)?,
        missing_values: profile.total_missing,
        numeric_columns: profile.numeric_columns.len(),
        categorical_columns: profile.categorical_columns.len(),
        problem_type,
    })
}

/// Recommendation used when no model could be ranked.
pub fn fallback(problem_type: ProblemType) -> (Vec<String>, &'static str) {
    let (models, reasoning) = match problem_type {
        ProblemType::Classification => (
            ["random_forest", "xgboost", "logistic_regression"],
            "Random Forest and XGBoost are robust ensemble methods, Logistic Regression provides interpretability",
        ),
        ProblemType::Regression => (
            ["random_forest", "xgboost", "linear_regression"],
            "Random Forest and XGBoost handle non-linear relationships, Linear Regression provides baseline",
        ),
    };
    (models.iter().map(|m| m.to_string()).collect(), reasoning)
}

fn metric_label(problem_type: ProblemType) -> &'static str {
    match problem_type {
        ProblemType::Classification => "test accuracy",
        ProblemType::Regression => "R²",
    }
}

fn fmt_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.3}"))
}

/// Ranked list, one sentence per top model, and a speed note when a faster
/// model trails the leader.
pub fn explain_performance(report: &ComparisonReport) -> String {
    if report.ranking.is_empty() {
        return String::new();
    }
    let label = metric_label(report.problem_type);
    let top: Vec<_> = report.ranking.iter().take(TOP_N).collect();

    let listed: Vec<String> = top
        .iter()
        .map(|r| format!("{}. {} ({})", r.rank, r.model_name, fmt_score(r.primary_score)))
        .collect();
    let mut parts = vec![format!(
        "Based on a comparison run, the top models are: {}.",
        listed.join(", ")
    )];

    for r in &top {
        parts.push(format!(
            "{} achieved a {label} of {} and trained in {:.2}s.",
            r.model_name,
            fmt_score(r.primary_score),
            r.training_time
        ));
    }

    let best = top[0];
    if let Some(fastest) = top
        .iter()
        .min_by(|a, b| a.training_time.total_cmp(&b.training_time))
        && fastest.model_name != best.model_name
        && fastest.training_time < best.training_time
    {
        parts.push(format!(
            "{} trains faster ({:.2}s vs {:.2}s) at a {label} of {} against {} for {}.",
            fastest.model_name,
            fastest.training_time,
            best.training_time,
            fmt_score(fastest.primary_score),
            fmt_score(best.primary_score),
            best.model_name
        ));
    }
    parts.join(" ")
}
