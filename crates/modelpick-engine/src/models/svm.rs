//! RBF-kernel support vector machines on linfa-svm.
//!
//! The kernel width follows the usual "scale" heuristic: the number of
//! features times the variance of the training matrix. Multi-class problems
//! are handled one-vs-rest over Platt-scaled probabilities.

use super::{
    Estimator, Predictions, argmax, class_labels, continuous_values, normalise_rows,
    present_classes, require_rows,
};
use crate::error::ModelError;
use crate::metrics::ClassProbabilities;
use linfa::Dataset;
use linfa::dataset::Pr;
use linfa::traits::{Fit, Predict};
use linfa_svm::{Svm, SvmParams};
use modelpick_data::{FeatureMatrix, TargetValues};
use ndarray::{Array1, Array2};

const NAME: &str = "svm";

/// Epsilon-insensitive loss width for regression, on standardised targets.
const SVR_LOSS_EPS: f64 = 0.1;
const SVR_C: f64 = 1.0;

fn records(x: &FeatureMatrix) -> Result<Array2<f64>, ModelError> {
    require_rows(x, NAME)?;
    let flat: Vec<f64> = x.rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((x.n_rows(), x.n_cols()), flat)
        .map_err(|e| ModelError::invalid_input(NAME, e))
}

/// Gaussian kernel width for `x`; falls back to 1 for constant input.
fn kernel_width(x: &Array2<f64>) -> f64 {
    let n = x.len() as f64;
    if n == 0.0 {
        return 1.0;
    }
    let mean = x.sum() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let width = x.ncols() as f64 * var;
    if width.is_finite() && width > 0.0 {
        width
    } else {
        1.0
    }
}

// ============================================================================
// Classification
// ============================================================================

/// SVC with one binary machine per class (a single machine for two classes).
pub struct SvmClassifier {
    kernel_eps: f64,
    classes: Vec<usize>,
    machines: Vec<Svm<f64, Pr>>,
}

impl SvmClassifier {
    pub fn new() -> Self {
        Self {
            kernel_eps: 1.0,
            classes: Vec::new(),
            machines: Vec::new(),
        }
    }

    fn fit_binary(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        positive: usize,
    ) -> Result<Svm<f64, Pr>, ModelError> {
        let targets = Array1::from_vec(labels.iter().map(|&l| l == positive).collect());
        let dataset = Dataset::new(x.clone(), targets);
        let params: SvmParams<f64, Pr> = Svm::<f64, Pr>::params().gaussian_kernel(self.kernel_eps);
        <SvmParams<f64, Pr> as Fit<_, _, _>>::fit(&params, &dataset)
            .map_err(|e| ModelError::fit(NAME, e))
    }

    /// Platt probabilities of every machine, one vector per machine.
    fn machine_scores(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.machines.is_empty() {
            return Err(ModelError::NotFitted {
                model: NAME.to_string(),
            });
        }
        let records = records(x)?;
        Ok(self
            .machines
            .iter()
            .map(|m| {
                let p: Array1<Pr> = m.predict(&records);
                p.iter().map(|pr| f64::from(**pr)).collect()
            })
            .collect())
    }
}

impl Default for SvmClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for SvmClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &TargetValues) -> Result<(), ModelError> {
        let (labels, _) = class_labels(y, NAME)?;
        let classes = present_classes(labels);
        if classes.len() < 2 {
            return Err(ModelError::invalid_input(
                NAME,
                "the training split contains fewer than 2 classes",
            ));
        }
        let records = records(x)?;
        self.kernel_eps = kernel_width(&records);

        let positives: Vec<usize> = if classes.len() == 2 {
            vec![classes[1]]
        } else {
            classes.clone()
        };
        let machines = positives
            .iter()
            .map(|&c| self.fit_binary(&records, labels, c))
            .collect::<Result<Vec<_>, _>>()?;

        self.classes = classes;
        self.machines = machines;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Predictions, ModelError> {
        let scores = self.machine_scores(x)?;
        let predicted = (0..x.n_rows())
            .map(|row| {
                if self.machines.len() == 1 {
                    if scores[0][row] > 0.5 {
                        self.classes[1]
                    } else {
                        self.classes[0]
                    }
                } else {
                    let row_scores: Vec<f64> = scores.iter().map(|s| s[row]).collect();
                    self.classes[argmax(&row_scores)]
                }
            })
            .collect();
        Ok(Predictions::Classes(predicted))
    }

    fn class_scores(&self, x: &FeatureMatrix) -> Result<Option<ClassProbabilities>, ModelError> {
        let scores = self.machine_scores(x)?;
        let mut rows: Vec<Vec<f64>> = (0..x.n_rows())
            .map(|row| {
                if self.machines.len() == 1 {
                    vec![1.0 - scores[0][row], scores[0][row]]
                } else {
                    scores.iter().map(|s| s[row]).collect()
                }
            })
            .collect();
        normalise_rows(&mut rows);
        Ok(Some(ClassProbabilities {
            classes: self.classes.clone(),
            rows,
        }))
    }
}

// ============================================================================
// Regression
// ============================================================================

/// Epsilon-SVR on a standardised target.
pub struct SvmRegressor {
    machine: Option<Svm<f64, f64>>,
    target_mean: f64,
    target_scale: f64,
}

impl SvmRegressor {
    pub fn new() -> Self {
        Self {
            machine: None,
            target_mean: 0.0,
            target_scale: 1.0,
        }
    }
}

impl Default for SvmRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for SvmRegressor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &TargetValues) -> Result<(), ModelError> {
        let values = continuous_values(y, NAME)?;
        let records = records(x)?;

        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let scale = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        let targets = Array1::from_vec(values.iter().map(|v| (v - mean) / scale).collect());

        let dataset = Dataset::new(records.clone(), targets);
        let params: SvmParams<f64, f64> = Svm::<f64, f64>::params()
            .gaussian_kernel(kernel_width(&records))
            .c_svr(SVR_C, Some(SVR_LOSS_EPS));
        let machine = <SvmParams<f64, f64> as Fit<_, _, _>>::fit(&params, &dataset)
            .map_err(|e| ModelError::fit(NAME, e))?;

        self.machine = Some(machine);
        self.target_mean = mean;
        self.target_scale = scale;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Predictions, ModelError> {
        let machine = self.machine.as_ref().ok_or(ModelError::NotFitted {
            model: NAME.to_string(),
        })?;
        let records = records(x)?;
        let scaled: Array1<f64> = machine.predict(&records);
        Ok(Predictions::Values(
            scaled
                .iter()
                .map(|v| v * self.target_scale + self.target_mean)
                .collect(),
        ))
    }
}
