//! Model adapters behind a uniform fit/predict/importance interface.
//!
//! Every registry entry maps to one adapter:
//!
//! - [`SmartcoreClassifier`] / [`SmartcoreRegressor`]: random forest,
//!   logistic and linear regression, Gaussian naive Bayes, CART trees
//! - [`SvmClassifier`] / [`SvmRegressor`]: RBF-kernel SVMs on linfa-svm
//! - [`BoostedClassifier`] / [`BoostedRegressor`]: gradient-boosted trees
//!   on gbdt with the `xgboost` and `lightgbm` presets
//!
//! Use [`build`] to construct the adapter for a [`ModelSpec`].
//!
//! Backends without a native importance measure report permutation
//! importance over the training split instead (see
//! [`permutation_importance`]). Importance is asked for after the fit, so
//! it never counts towards the measured fit time.

mod boosting;
mod smartcore_models;
mod svm;

pub use boosting::{BoostedClassifier, BoostedRegressor, BoostingPreset};
pub use smartcore_models::{SmartcoreClassifier, SmartcoreRegressor};
pub use svm::{SvmClassifier, SvmRegressor};

use crate::error::ModelError;
use crate::metrics::ClassProbabilities;
use crate::registry::{ModelKind, ModelSpec};
use modelpick_data::{FeatureMatrix, ProblemType, TargetValues};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Rows of the training split used for permutation importance.
const IMPORTANCE_MAX_ROWS: usize = 2000;

/// Output of [`Estimator::predict`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// Class indices into the training target's label names.
    Classes(Vec<usize>),
    Values(Vec<f64>),
}

impl Predictions {
    pub fn len(&self) -> usize {
        match self {
            Predictions::Classes(v) => v.len(),
            Predictions::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a fitted model exposes about feature influence.
#[derive(Debug, Clone, PartialEq)]
pub enum Importance {
    /// One score per feature, used as-is.
    Scores(Vec<f64>),
    /// Linear coefficients, one row per output.
    Coefficients(Vec<Vec<f64>>),
}

/// A trainable model.
pub trait Estimator: Send {
    /// Registry name, used in error messages.
    fn name(&self) -> &'static str;

    /// Fit on the training split.
    fn fit(&mut self, x: &FeatureMatrix, y: &TargetValues) -> Result<(), ModelError>;

    /// Predict for every row of `x`.
    fn predict(&self, x: &FeatureMatrix) -> Result<Predictions, ModelError>;

    /// Feature influence of the fitted model, if it has any. `x` and `y`
    /// are the training split the model was fitted on.
    fn importance(
        &self,
        _x: &FeatureMatrix,
        _y: &TargetValues,
    ) -> Result<Option<Importance>, ModelError> {
        Ok(None)
    }

    /// Per-class scores for every row of `x`, for classifiers that have them.
    fn class_scores(&self, _x: &FeatureMatrix) -> Result<Option<ClassProbabilities>, ModelError> {
        Ok(None)
    }
}

/// Construct the adapter for `spec`. The seed is only forwarded to models
/// whose spec accepts one.
pub fn build(spec: &ModelSpec, seed: u64) -> Box<dyn Estimator> {
    let seed = spec.accepts_seed.then_some(seed);
    match (spec.problem_type, spec.kind) {
        (ProblemType::Classification, ModelKind::Svm) => Box::new(SvmClassifier::new()),
        (ProblemType::Regression, ModelKind::Svm) => Box::new(SvmRegressor::new()),
        (ProblemType::Classification, ModelKind::Xgboost) => {
            Box::new(BoostedClassifier::new(BoostingPreset::Xgboost, seed))
        }
        (ProblemType::Classification, ModelKind::Lightgbm) => {
            Box::new(BoostedClassifier::new(BoostingPreset::Lightgbm, seed))
        }
        (ProblemType::Regression, ModelKind::Xgboost) => {
            Box::new(BoostedRegressor::new(BoostingPreset::Xgboost, seed))
        }
        (ProblemType::Regression, ModelKind::Lightgbm) => {
            Box::new(BoostedRegressor::new(BoostingPreset::Lightgbm, seed))
        }
        (ProblemType::Classification, kind) => Box::new(SmartcoreClassifier::new(kind, seed)),
        (ProblemType::Regression, kind) => Box::new(SmartcoreRegressor::new(kind, seed)),
    }
}

/// Per-column importance map. Coefficients become absolute values averaged
/// over outputs; anything that does not line up with the columns yields an
/// empty map.
pub fn importance_map(importance: Option<Importance>, columns: &[String]) -> BTreeMap<String, f64> {
    let scores = match importance {
        Some(Importance::Scores(scores)) => scores,
        Some(Importance::Coefficients(rows)) if !rows.is_empty() => {
            let n = rows.len() as f64;
            (0..columns.len())
                .map(|j| {
                    rows.iter()
                        .map(|row| row.get(j).copied().unwrap_or(0.0).abs())
                        .sum::<f64>()
                        / n
                })
                .collect()
        }
        _ => return BTreeMap::new(),
    };
    if scores.len() != columns.len() {
        return BTreeMap::new();
    }
    columns.iter().cloned().zip(scores).collect()
}

/// Drop in fit quality when each column is shuffled, normalised to sum to 1.
///
/// Quality is accuracy for class predictions and negative mean squared
/// error for values. Columns whose shuffle does not hurt score 0; all zeros
/// when no column matters. At most [`IMPORTANCE_MAX_ROWS`] rows are used.
pub(crate) fn permutation_importance<F>(
    x: &FeatureMatrix,
    y: &TargetValues,
    seed: u64,
    predict: F,
) -> Result<Vec<f64>, ModelError>
where
    F: Fn(&FeatureMatrix) -> Result<Predictions, ModelError>,
{
    let n = x.n_rows().min(IMPORTANCE_MAX_ROWS);
    let sample = FeatureMatrix {
        columns: x.columns.clone(),
        rows: x.rows[..n].to_vec(),
    };
    let truth = match y {
        TargetValues::Classes { labels, names } => TargetValues::Classes {
            labels: labels[..n.min(labels.len())].to_vec(),
            names: names.clone(),
        },
        TargetValues::Continuous { values } => TargetValues::Continuous {
            values: values[..n.min(values.len())].to_vec(),
        },
    };

    let baseline = fit_quality(&predict(&sample)?, &truth);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = sample.clone();
    let mut drops = Vec::with_capacity(sample.n_cols());
    for j in 0..sample.n_cols() {
        let mut column: Vec<f64> = sample.rows.iter().map(|row| row[j]).collect();
        column.shuffle(&mut rng);
        for (row, v) in shuffled.rows.iter_mut().zip(column) {
            row[j] = v;
        }
        let permuted = fit_quality(&predict(&shuffled)?, &truth);
        drops.push((baseline - permuted).max(0.0));
        for (row, original) in shuffled.rows.iter_mut().zip(&sample.rows) {
            row[j] = original[j];
        }
    }

    let total: f64 = drops.iter().sum();
    if total.is_finite() && total > 0.0 {
        drops.iter_mut().for_each(|d| *d /= total);
    } else {
        drops.iter_mut().for_each(|d| *d = 0.0);
    }
    Ok(drops)
}

fn fit_quality(predicted: &Predictions, y: &TargetValues) -> f64 {
    match (predicted, y) {
        (Predictions::Classes(p), TargetValues::Classes { labels, .. }) => {
            crate::metrics::accuracy(labels, p).unwrap_or(0.0)
        }
        (Predictions::Values(p), TargetValues::Continuous { values }) => {
            -crate::metrics::mean_squared_error(values, p).unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Normalise non-negative per-class scores so every row sums to 1; rows
/// without mass become uniform.
pub(crate) fn normalise_rows(rows: &mut [Vec<f64>]) {
    for row in rows {
        let total: f64 = row.iter().filter(|v| v.is_finite()).map(|v| v.max(0.0)).sum();
        let width = row.len().max(1) as f64;
        for v in row.iter_mut() {
            *v = if total > 0.0 && v.is_finite() {
                v.max(0.0) / total
            } else {
                1.0 / width
            };
        }
    }
}

// ============================================================================
// Shared input helpers
// ============================================================================

pub(crate) fn require_rows(x: &FeatureMatrix, model: &str) -> Result<(), ModelError> {
    if x.n_rows() == 0 || x.n_cols() == 0 {
        return Err(ModelError::invalid_input(model, "empty feature matrix"));
    }
    Ok(())
}

pub(crate) fn class_labels<'a>(
    y: &'a TargetValues,
    model: &str,
) -> Result<(&'a [usize], usize), ModelError> {
    match y {
        TargetValues::Classes { labels, names } => Ok((labels.as_slice(), names.len())),
        TargetValues::Continuous { .. } => Err(ModelError::invalid_input(
            model,
            "expected class labels, got a continuous target",
        )),
    }
}

pub(crate) fn continuous_values<'a>(
    y: &'a TargetValues,
    model: &str,
) -> Result<&'a [f64], ModelError> {
    match y {
        TargetValues::Continuous { values } => Ok(values.as_slice()),
        TargetValues::Classes { .. } => Err(ModelError::invalid_input(
            model,
            "expected a continuous target, got class labels",
        )),
    }
}

/// Distinct labels present in `labels`, ascending.
pub(crate) fn present_classes(labels: &[usize]) -> Vec<usize> {
    let mut classes = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Index of the largest score; ties keep the first.
pub(crate) fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate() {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CLASSIFICATION_MODELS, REGRESSION_MODELS};

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_importance_from_coefficients() {
        let map = importance_map(
            Some(Importance::Coefficients(vec![
                vec![1.0, -2.0],
                vec![-3.0, 0.0],
            ])),
            &columns(&["a", "b"]),
        );
        assert_eq!(map["a"], 2.0);
        assert_eq!(map["b"], 1.0);
    }

    #[test]
    fn test_importance_scores_used_directly() {
        let map = importance_map(
            Some(Importance::Scores(vec![0.7, 0.3])),
            &columns(&["a", "b"]),
        );
        assert_eq!(map["a"], 0.7);
    }

    #[test]
    fn test_importance_absent_or_mismatched() {
        assert!(importance_map(None, &columns(&["a"])).is_empty());
        let mismatched = importance_map(Some(Importance::Scores(vec![1.0])), &columns(&["a", "b"]));
        assert!(mismatched.is_empty());
    }

    #[test]
    fn test_build_every_spec() {
        for spec in CLASSIFICATION_MODELS.iter().chain(REGRESSION_MODELS.iter()) {
            let model = build(spec, 42);
            assert_eq!(model.name(), spec.name);
        }
    }

    #[test]
    fn test_permutation_importance_finds_informative_column() {
        // label depends on the first column only
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i >= 20)).collect();
        let x = FeatureMatrix {
            columns: columns(&["signal", "noise"]),
            rows,
        };
        let y = TargetValues::Classes {
            labels,
            names: columns(&["no", "yes"]),
        };
        let threshold = |m: &FeatureMatrix| -> Result<Predictions, ModelError> {
            Ok(Predictions::Classes(
                m.rows.iter().map(|r| usize::from(r[0] >= 20.0)).collect(),
            ))
        };

        let scores = permutation_importance(&x, &y, 42, threshold).unwrap();
        assert_eq!(scores, vec![1.0, 0.0]);
        assert_eq!(scores, permutation_importance(&x, &y, 42, threshold).unwrap());
    }

    #[test]
    fn test_permutation_importance_all_zero_when_nothing_matters() {
        let x = FeatureMatrix {
            columns: columns(&["a"]),
            rows: (0..10).map(|i| vec![i as f64]).collect(),
        };
        let y = TargetValues::Continuous {
            values: vec![3.0; 10],
        };
        let constant = |m: &FeatureMatrix| -> Result<Predictions, ModelError> {
            Ok(Predictions::Values(vec![3.0; m.n_rows()]))
        };
        assert_eq!(
            permutation_importance(&x, &y, 1, constant).unwrap(),
            vec![0.0]
        );
    }

    #[test]
    fn test_normalise_rows() {
        let mut rows = vec![vec![0.2, 0.6], vec![0.0, 0.0]];
        normalise_rows(&mut rows);
        assert!((rows[0][0] - 0.25).abs() < 1e-12);
        assert_eq!(rows[1], vec![0.5, 0.5]);
    }

    #[test]
    fn test_argmax_and_classes() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9]), 1);
        assert_eq!(present_classes(&[2, 0, 2, 1, 0]), vec![0, 1, 2]);
    }
}
