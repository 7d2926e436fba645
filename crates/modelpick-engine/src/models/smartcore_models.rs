//! Adapters over smartcore estimators.
//!
//! smartcore exposes coefficients for the linear models only, so forests
//! and trees report permutation importance over the training split. Logistic
//! regression is the only one with class scores.

use super::{
    Estimator, Importance, Predictions, class_labels, continuous_values, permutation_importance,
    require_rows,
};
use crate::error::ModelError;
use crate::metrics::ClassProbabilities;
use crate::registry::ModelKind;
use modelpick_data::{FeatureMatrix, TargetValues};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use smartcore::naive_bayes::gaussian::{GaussianNB, GaussianNBParameters};
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

type Matrix = DenseMatrix<f64>;

fn dense(x: &FeatureMatrix, model: &str) -> Result<Matrix, ModelError> {
    require_rows(x, model)?;
    Ok(DenseMatrix::from_2d_vec(&x.rows))
}

/// Coefficient matrix as one row per output, whichever way smartcore laid it out.
fn coefficient_rows(m: &Matrix, n_features: usize) -> Vec<Vec<f64>> {
    let (rows, cols) = m.shape();
    if cols == n_features {
        (0..rows)
            .map(|i| (0..cols).map(|j| *m.get((i, j))).collect())
            .collect()
    } else if rows == n_features {
        (0..cols)
            .map(|j| (0..rows).map(|i| *m.get((i, j))).collect())
            .collect()
    } else {
        Vec::new()
    }
}

type Logistic = LogisticRegression<f64, u32, Matrix, Vec<u32>>;

/// Sigmoid of the single logit for two classes, softmax over one logit per
/// class otherwise.
fn logistic_scores(
    m: &Logistic,
    x: &FeatureMatrix,
    n_features: usize,
) -> Result<ClassProbabilities, ModelError> {
    let weights = coefficient_rows(m.coefficients(), n_features);
    let classes: Vec<usize> = m.classes().iter().map(|&c| c as usize).collect();
    let outputs = if classes.len() == 2 { 1 } else { classes.len() };
    if weights.len() != outputs || m.intercept().shape().0 < outputs {
        return Err(ModelError::predict(
            "logistic_regression",
            "coefficient shape does not match the classes",
        ));
    }

    let rows = x
        .rows
        .iter()
        .map(|row| {
            let logit = |k: usize| {
                weights[k].iter().zip(row).map(|(w, v)| w * v).sum::<f64>()
                    + *m.intercept().get((k, 0))
            };
            if outputs == 1 {
                let p = 1.0 / (1.0 + (-logit(0)).exp());
                vec![1.0 - p, p]
            } else {
                let z: Vec<f64> = (0..outputs).map(logit).collect();
                let top = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let exp: Vec<f64> = z.iter().map(|v| (v - top).exp()).collect();
                let total: f64 = exp.iter().sum();
                exp.into_iter().map(|e| e / total).collect()
            }
        })
        .collect();
    Ok(ClassProbabilities { classes, rows })
}

// ============================================================================
// Classification
// ============================================================================

enum FittedClassifier {
    RandomForest(RandomForestClassifier<f64, u32, Matrix, Vec<u32>>),
    Logistic(Logistic),
    NaiveBayes(GaussianNB<f64, u32, Matrix, Vec<u32>>),
    Tree(DecisionTreeClassifier<f64, u32, Matrix, Vec<u32>>),
}

/// smartcore-backed classifier for random forest, logistic regression,
/// Gaussian naive Bayes, and decision tree.
pub struct SmartcoreClassifier {
    kind: ModelKind,
    seed: Option<u64>,
    n_features: usize,
    fitted: Option<FittedClassifier>,
}

impl SmartcoreClassifier {
    pub fn new(kind: ModelKind, seed: Option<u64>) -> Self {
        Self {
            kind,
            seed,
            n_features: 0,
            fitted: None,
        }
    }
}

impl Estimator for SmartcoreClassifier {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &TargetValues) -> Result<(), ModelError> {
        let name = self.name();
        let matrix = dense(x, name)?;
        let (labels, _) = class_labels(y, name)?;
        let labels: Vec<u32> = labels.iter().map(|&l| l as u32).collect();
        let fit_err = |e: smartcore::error::Failed| ModelError::fit(name, e);

        let fitted = match self.kind {
            ModelKind::RandomForest => {
                let mut params = RandomForestClassifierParameters::default();
                if let Some(seed) = self.seed {
                    params = params.with_seed(seed);
                }
                FittedClassifier::RandomForest(
                    RandomForestClassifier::fit(&matrix, &labels, params).map_err(fit_err)?,
                )
            }
            ModelKind::LogisticRegression => FittedClassifier::Logistic(
                LogisticRegression::fit(&matrix, &labels, LogisticRegressionParameters::default())
                    .map_err(fit_err)?,
            ),
            ModelKind::NaiveBayes => FittedClassifier::NaiveBayes(
                GaussianNB::fit(&matrix, &labels, GaussianNBParameters::default())
                    .map_err(fit_err)?,
            ),
            ModelKind::DecisionTree => FittedClassifier::Tree(
                DecisionTreeClassifier::fit(
                    &matrix,
                    &labels,
                    DecisionTreeClassifierParameters {
                        seed: self.seed,
                        ..Default::default()
                    },
                )
                .map_err(fit_err)?,
            ),
            other => {
                return Err(ModelError::invalid_input(
                    name,
                    format!("{} is not a smartcore classifier", other.name()),
                ));
            }
        };

        self.n_features = x.n_cols();
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Predictions, ModelError> {
        let name = self.name();
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(ModelError::NotFitted {
                model: name.to_string(),
            })?;
        let matrix = dense(x, name)?;
        let predict_err = |e: smartcore::error::Failed| ModelError::predict(name, e);

        let predicted: Vec<u32> = match fitted {
            FittedClassifier::RandomForest(m) => m.predict(&matrix).map_err(predict_err)?,
            FittedClassifier::Logistic(m) => m.predict(&matrix).map_err(predict_err)?,
            FittedClassifier::NaiveBayes(m) => m.predict(&matrix).map_err(predict_err)?,
            FittedClassifier::Tree(m) => m.predict(&matrix).map_err(predict_err)?,
        };
        Ok(Predictions::Classes(
            predicted.into_iter().map(|c| c as usize).collect(),
        ))
    }

    fn importance(
        &self,
        x: &FeatureMatrix,
        y: &TargetValues,
    ) -> Result<Option<Importance>, ModelError> {
        match self.fitted.as_ref() {
            None => Ok(None),
            Some(FittedClassifier::Logistic(m)) => Ok(Some(Importance::Coefficients(
                coefficient_rows(m.coefficients(), self.n_features),
            ))),
            Some(FittedClassifier::NaiveBayes(_)) => Ok(None),
            Some(_) => {
                let scores =
                    permutation_importance(x, y, self.seed.unwrap_or_default(), |m| self.predict(m))?;
                Ok(Some(Importance::Scores(scores)))
            }
        }
    }

    fn class_scores(&self, x: &FeatureMatrix) -> Result<Option<ClassProbabilities>, ModelError> {
        match self.fitted.as_ref() {
            Some(FittedClassifier::Logistic(m)) => {
                require_rows(x, self.name())?;
                logistic_scores(m, x, self.n_features).map(Some)
            }
            _ => Ok(None),
        }
    }
}

// ============================================================================
// Regression
// ============================================================================

enum FittedRegressor {
    RandomForest(RandomForestRegressor<f64, f64, Matrix, Vec<f64>>),
    Linear(LinearRegression<f64, f64, Matrix, Vec<f64>>),
    Tree(DecisionTreeRegressor<f64, f64, Matrix, Vec<f64>>),
}

/// smartcore-backed regressor for random forest, linear regression, and
/// decision tree.
pub struct SmartcoreRegressor {
    kind: ModelKind,
    seed: Option<u64>,
    n_features: usize,
    fitted: Option<FittedRegressor>,
}

impl SmartcoreRegressor {
    pub fn new(kind: ModelKind, seed: Option<u64>) -> Self {
        Self {
            kind,
            seed,
            n_features: 0,
            fitted: None,
        }
    }
}

impl Estimator for SmartcoreRegressor {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &TargetValues) -> Result<(), ModelError> {
        let name = self.name();
        let matrix = dense(x, name)?;
        let values: Vec<f64> = continuous_values(y, name)?.to_vec();
        let fit_err = |e: smartcore::error::Failed| ModelError::fit(name, e);

        let fitted = match self.kind {
            ModelKind::RandomForest => {
                let mut params = RandomForestRegressorParameters::default();
                if let Some(seed) = self.seed {
                    params = params.with_seed(seed);
                }
                FittedRegressor::RandomForest(
                    RandomForestRegressor::fit(&matrix, &values, params).map_err(fit_err)?,
                )
            }
            ModelKind::LinearRegression => FittedRegressor::Linear(
                LinearRegression::fit(&matrix, &values, LinearRegressionParameters::default())
                    .map_err(fit_err)?,
            ),
            ModelKind::DecisionTree => FittedRegressor::Tree(
                DecisionTreeRegressor::fit(
                    &matrix,
                    &values,
                    DecisionTreeRegressorParameters {
                        seed: self.seed,
                        ..Default::default()
                    },
                )
                .map_err(fit_err)?,
            ),
            other => {
                return Err(ModelError::invalid_input(
                    name,
                    format!("{} is not a smartcore regressor", other.name()),
                ));
            }
        };

        self.n_features = x.n_cols();
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Predictions, ModelError> {
        let name = self.name();
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(ModelError::NotFitted {
                model: name.to_string(),
            })?;
        let matrix = dense(x, name)?;
        let predict_err = |e: smartcore::error::Failed| ModelError::predict(name, e);

        let predicted: Vec<f64> = match fitted {
            FittedRegressor::RandomForest(m) => m.predict(&matrix).map_err(predict_err)?,
            FittedRegressor::Linear(m) => m.predict(&matrix).map_err(predict_err)?,
            FittedRegressor::Tree(m) => m.predict(&matrix).map_err(predict_err)?,
        };
        Ok(Predictions::Values(predicted))
    }

    fn importance(
        &self,
        x: &FeatureMatrix,
        y: &TargetValues,
    ) -> Result<Option<Importance>, ModelError> {
        match self.fitted.as_ref() {
            None => Ok(None),
            Some(FittedRegressor::Linear(m)) => Ok(Some(Importance::Coefficients(
                coefficient_rows(m.coefficients(), self.n_features),
            ))),
            Some(_) => {
                let scores =
                    permutation_importance(x, y, self.seed.unwrap_or_default(), |m| self.predict(m))?;
                Ok(Some(Importance::Scores(scores)))
            }
        }
    }
}
