//! Model comparison: ranking by the primary metric and comparative insights.
//!
//! The primary metric is `test_accuracy` for classification and `r2_score`
//! for regression. Only successful results are ranked. The sort is stable,
//! so equal scores keep the order the results were given in, and a missing
//! score ranks below every present one.

use crate::metrics::{R2_SCORE, TEST_ACCURACY, TRAIN_ACCURACY};
use crate::pipeline::TrainingResult;
use crate::registry::kind_of;
use modelpick_data::ProblemType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Slowest/fastest ratio above which the speed difference is reported.
pub const SPEED_RATIO_THRESHOLD: f64 = 5.0;

/// Best-minus-worst test accuracy above which the gap is reported.
pub const ACCURACY_GAP_THRESHOLD: f64 = 0.1;

/// Train-minus-test accuracy above which a model is flagged as overfitting.
pub const OVERFITTING_THRESHOLD: f64 = 0.1;

pub const EXCELLENT_R2: f64 = 0.9;
pub const POOR_R2: f64 = 0.5;

/// Metric used to rank results for `problem_type`.
pub fn primary_metric(problem_type: ProblemType) -> &'static str {
    match problem_type {
        ProblemType::Classification => TEST_ACCURACY,
        ProblemType::Regression => R2_SCORE,
    }
}

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedModel {
    /// 1-based position.
    pub rank: usize,
    pub model_name: String,
    pub primary_score: Option<f64>,
    pub training_time: f64,
}

/// Comparison of a set of training results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ComparisonReport {
    pub problem_type: ProblemType,
    pub primary_metric: String,
    pub ranking: Vec<RankedModel>,
    /// metric name -> model name -> value, over successful results.
    pub detailed_metric_matrix: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    pub insights: Vec<String>,
    /// Top of the ranking; `None` when no model succeeded.
    pub best_model: Option<String>,
}

impl ComparisonReport {
    /// The first `n` ranked model names.
    pub fn top(&self, n: usize) -> Vec<String> {
        self.ranking
            .iter()
            .take(n)
            .map(|r| r.model_name.clone())
            .collect()
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank `results` and derive insights.
pub fn rank(results: &[TrainingResult], problem_type: ProblemType) -> ComparisonReport {
    let metric = primary_metric(problem_type);
    let mut successful: Vec<&TrainingResult> = results.iter().filter(|r| r.is_success()).collect();
    successful.sort_by(|a, b| descending(a.metric(metric), b.metric(metric)));

    let ranking: Vec<RankedModel> = successful
        .iter()
        .enumerate()
        .map(|(i, r)| RankedModel {
            rank: i + 1,
            model_name: r.model_name.clone(),
            primary_score: r.metric(metric),
            training_time: r.training_time_seconds,
        })
        .collect();

    let mut matrix: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    for r in &successful {
        for (key, value) in &r.metrics {
            matrix
                .entry(key.clone())
                .or_default()
                .insert(r.model_name.clone(), *value);
        }
    }

    let mut insights = Vec::new();
    speed_insight(&successful, &mut insights);
    match problem_type {
        ProblemType::Classification => classification_insights(&successful, &mut insights),
        ProblemType::Regression => regression_insights(&successful, &mut insights),
    }
    family_insight(results, &mut insights);

    ComparisonReport {
        problem_type,
        primary_metric: metric.to_string(),
        best_model: ranking.first().map(|r| r.model_name.clone()),
        ranking,
        detailed_metric_matrix: matrix,
        insights,
    }
}

fn speed_insight(ranked: &[&TrainingResult], insights: &mut Vec<String>) {
    let fastest = ranked
        .iter()
        .min_by(|a, b| a.training_time_seconds.total_cmp(&b.training_time_seconds));
    let slowest = ranked
        .iter()
        .max_by(|a, b| a.training_time_seconds.total_cmp(&b.training_time_seconds));
    if let (Some(fast), Some(slow)) = (fastest, slowest)
        && fast.training_time_seconds > 0.0
    {
        let ratio = slow.training_time_seconds / fast.training_time_seconds;
        if ratio > SPEED_RATIO_THRESHOLD {
            insights.push(format!(
                "{} is significantly faster ({ratio:.1}x) than {}",
                fast.model_name, slow.model_name
            ));
        }
    }
}

fn classification_insights(ranked: &[&TrainingResult], insights: &mut Vec<String>) {
    let scored: Vec<(&str, f64)> = ranked
        .iter()
        .filter_map(|r| r.metric(TEST_ACCURACY).map(|a| (r.model_name.as_str(), a)))
        .collect();
    if let (Some(best), Some(worst)) = (scored.first(), scored.last())
        && best.1 - worst.1 > ACCURACY_GAP_THRESHOLD
    {
        insights.push(format!(
            "Significant accuracy difference: {} ({:.3}) vs {} ({:.3})",
            best.0, best.1, worst.0, worst.1
        ));
    }

    for r in ranked {
        if let (Some(train), Some(test)) = (r.metric(TRAIN_ACCURACY), r.metric(TEST_ACCURACY))
            && train - test > OVERFITTING_THRESHOLD
        {
            insights.push(format!(
                "{} shows signs of overfitting (train: {train:.3}, test: {test:.3})",
                r.model_name
            ));
        }
    }
}

fn regression_insights(ranked: &[&TrainingResult], insights: &mut Vec<String>) {
    let Some((name, best)) = ranked
        .first()
        .and_then(|r| r.metric(R2_SCORE).map(|s| (r.model_name.as_str(), s)))
    else {
        return;
    };
    if best > EXCELLENT_R2 {
        insights.push(format!("{name} shows excellent fit (R² = {best:.3})"));
    } else if best < POOR_R2 {
        insights.push(
            "All models show poor fit (R² < 0.5). Consider feature engineering or different algorithms."
                .to_string(),
        );
    }
}

fn family_insight(results: &[TrainingResult], insights: &mut Vec<String>) {
    let kinds: Vec<_> = results.iter().filter_map(|r| kind_of(&r.model_name)).collect();
    if kinds.iter().any(|k| k.is_ensemble()) && kinds.iter().any(|k| k.is_linear()) {
        insights.push(
            "Dataset benefits from both ensemble methods and linear models - consider feature importance analysis"
                .to_string(),
        );
    }
}
