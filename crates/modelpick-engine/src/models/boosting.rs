//! Gradient-boosted trees on gbdt.
//!
//! `xgboost` and `lightgbm` are two presets over the same booster: the
//! first grows deep trees with a large step, the second shallower leaves
//! with a minimum leaf size and a smaller step.
//!
//! gbdt keeps its trees private, so importance is permutation importance
//! over the training split, seeded from the run seed.

use super::{
    Estimator, Importance, Predictions, argmax, class_labels, continuous_values,
    normalise_rows, permutation_importance, present_classes, require_rows,
};
use crate::error::ModelError;
use crate::metrics::ClassProbabilities;
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use modelpick_data::{FeatureMatrix, TargetValues};

const SQUARED_ERROR: &str = "SquaredError";
const LOG_LIKELIHOOD: &str = "LogLikelyhood";

/// Booster settings behind a registry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostingPreset {
    Xgboost,
    Lightgbm,
}

impl BoostingPreset {
    pub fn name(&self) -> &'static str {
        match self {
            BoostingPreset::Xgboost => "xgboost",
            BoostingPreset::Lightgbm => "lightgbm",
        }
    }

    fn config(&self, feature_size: usize, loss: &str) -> Config {
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss(loss);
        match self {
            BoostingPreset::Xgboost => {
                config.set_max_depth(6);
                config.set_shrinkage(0.3);
                config.set_iterations(100);
            }
            BoostingPreset::Lightgbm => {
                config.set_max_depth(8);
                config.set_shrinkage(0.1);
                config.set_iterations(100);
                config.set_min_leaf_size(20);
            }
        }
        config
    }
}

fn training_data(x: &FeatureMatrix, labels: impl Iterator<Item = f32>) -> DataVec {
    x.rows
        .iter()
        .zip(labels)
        .map(|(row, label)| {
            let features = row.iter().map(|&v| v as f32).collect();
            Data::new_training_data(features, 1.0, label, None)
        })
        .collect()
}

fn test_data(x: &FeatureMatrix) -> DataVec {
    training_data(x, std::iter::repeat(0.0))
}

// ============================================================================
// Classification
// ============================================================================

enum ClassModel {
    /// Only one class was seen during fit.
    Constant(usize),
    /// One booster per positive class; a single booster for two classes.
    Boosters {
        classes: Vec<usize>,
        boosters: Vec<GBDT>,
    },
}

/// Boosted classifier, one-vs-rest on log-likelihood loss.
pub struct BoostedClassifier {
    preset: BoostingPreset,
    seed: Option<u64>,
    fitted: Option<ClassModel>,
}

impl BoostedClassifier {
    pub fn new(preset: BoostingPreset, seed: Option<u64>) -> Self {
        Self {
            preset,
            seed,
            fitted: None,
        }
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn fitted(&self) -> Result<&ClassModel, ModelError> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted {
            model: self.name().to_string(),
        })
    }
}

/// Positive-class probability of every booster, one vector per booster.
fn booster_scores(boosters: &[GBDT], x: &FeatureMatrix) -> Vec<Vec<f64>> {
    let data = test_data(x);
    boosters
        .iter()
        .map(|b| b.predict(&data).into_iter().map(f64::from).collect())
        .collect()
}

impl Estimator for BoostedClassifier {
    fn name(&self) -> &'static str {
        self.preset.name()
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &TargetValues) -> Result<(), ModelError> {
        let name = self.name();
        require_rows(x, name)?;
        let (labels, _) = class_labels(y, name)?;
        let classes = present_classes(labels);

        let model = match classes.as_slice() {
            [] => return Err(ModelError::invalid_input(name, "empty target")),
            [only] => ClassModel::Constant(*only),
            _ => {
                let positives = if classes.len() == 2 {
                    &classes[1..]
                } else {
                    &classes[..]
                };
                let boosters = positives
                    .iter()
                    .map(|&positive| {
                        let config = self.preset.config(x.n_cols(), LOG_LIKELIHOOD);
                        let mut booster = GBDT::new(&config);
                        let signs = labels
                            .iter()
                            .map(|&l| if l == positive { 1.0 } else { -1.0 });
                        let mut data = training_data(x, signs);
                        booster.fit(&mut data);
                        booster
                    })
                    .collect();
                ClassModel::Boosters { classes, boosters }
            }
        };
        self.fitted = Some(model);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Predictions, ModelError> {
        let fitted = self.fitted()?;
        require_rows(x, self.name())?;
        let predicted = match fitted {
            ClassModel::Constant(class) => vec![*class; x.n_rows()],
            ClassModel::Boosters { classes, boosters } => {
                let scores = booster_scores(boosters, x);
                (0..x.n_rows())
                    .map(|row| {
                        if boosters.len() == 1 {
                            if scores[0][row] > 0.5 {
                                classes[1]
                            } else {
                                classes[0]
                            }
                        } else {
                            let row_scores: Vec<f64> = scores.iter().map(|s| s[row]).collect();
                            classes[argmax(&row_scores)]
                        }
                    })
                    .collect()
            }
        };
        Ok(Predictions::Classes(predicted))
    }

    fn importance(
        &self,
        x: &FeatureMatrix,
        y: &TargetValues,
    ) -> Result<Option<Importance>, ModelError> {
        if !self.is_fitted() {
            return Ok(None);
        }
        let scores =
            permutation_importance(x, y, self.seed.unwrap_or_default(), |m| self.predict(m))?;
        Ok(Some(Importance::Scores(scores)))
    }

    /// Booster probabilities; one-vs-rest outputs are rescaled to sum to 1.
    fn class_scores(&self, x: &FeatureMatrix) -> Result<Option<ClassProbabilities>, ModelError> {
        let fitted = self.fitted()?;
        require_rows(x, self.name())?;
        let probabilities = match fitted {
            ClassModel::Constant(class) => ClassProbabilities {
                classes: vec![*class],
                rows: vec![vec![1.0]; x.n_rows()],
            },
            ClassModel::Boosters { classes, boosters } => {
                let scores = booster_scores(boosters, x);
                let mut rows: Vec<Vec<f64>> = (0..x.n_rows())
                    .map(|row| {
                        if boosters.len() == 1 {
                            vec![1.0 - scores[0][row], scores[0][row]]
                        } else {
                            scores.iter().map(|s| s[row]).collect()
                        }
                    })
                    .collect();
                normalise_rows(&mut rows);
                ClassProbabilities {
                    classes: classes.clone(),
                    rows,
                }
            }
        };
        Ok(Some(probabilities))
    }
}

// ============================================================================
// Regression
// ============================================================================

/// Boosted regressor on squared-error loss.
pub struct BoostedRegressor {
    preset: BoostingPreset,
    seed: Option<u64>,
    booster: Option<GBDT>,
}

impl BoostedRegressor {
    pub fn new(preset: BoostingPreset, seed: Option<u64>) -> Self {
        Self {
            preset,
            seed,
            booster: None,
        }
    }

    fn is_fitted(&self) -> bool {
        self.booster.is_some()
    }
}

impl Estimator for BoostedRegressor {
    fn name(&self) -> &'static str {
        self.preset.name()
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &TargetValues) -> Result<(), ModelError> {
        let name = self.name();
        require_rows(x, name)?;
        let values = continuous_values(y, name)?;
        let config = self.preset.config(x.n_cols(), SQUARED_ERROR);
        let mut booster = GBDT::new(&config);
        let mut data = training_data(x, values.iter().map(|&v| v as f32));
        booster.fit(&mut data);
        self.booster = Some(booster);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Predictions, ModelError> {
        let name = self.name();
        let booster = self.booster.as_ref().ok_or(ModelError::NotFitted {
            model: name.to_string(),
        })?;
        require_rows(x, name)?;
        let predicted = booster.predict(&test_data(x));
        Ok(Predictions::Values(
            predicted.into_iter().map(f64::from).collect(),
        ))
    }

    fn importance(
        &self,
        x: &FeatureMatrix,
        y: &TargetValues,
    ) -> Result<Option<Importance>, ModelError> {
        if !self.is_fitted() {
            return Ok(None);
        }
        let scores =
            permutation_importance(x, y, self.seed.unwrap_or_default(), |m| self.predict(m))?;
        Ok(Some(Importance::Scores(scores)))
    }
}
