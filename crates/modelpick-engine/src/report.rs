//! Strengths, weaknesses and recommendations for a single trained model.

use crate::metrics::{Diagnostics, F1_SCORE, PRECISION, R2_SCORE, RECALL, TEST_ACCURACY};
use crate::pipeline::TrainingResult;
use crate::registry::{ModelKind, kind_of};
use modelpick_data::ProblemType;
use serde::{Deserialize, Serialize};

/// Number of features listed in [`ModelReport::top_features`].
pub const TOP_FEATURES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub feature: String,
    pub importance: f64,
}

/// Qualitative read-out of one successful [`TrainingResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ModelReport {
    pub model_name: String,
    pub training_time: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub top_features: Vec<FeatureScore>,
    pub recommendations: Vec<String>,
}

/// Build the report for `result`; `None` if the model did not train.
pub fn model_report(result: &TrainingResult, problem_type: ProblemType) -> Option<ModelReport> {
    if !result.is_success() {
        return None;
    }
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut recommendations = Vec::new();

    match problem_type {
        ProblemType::Classification => {
            let accuracy = result.metric(TEST_ACCURACY).unwrap_or(0.0);
            let f1 = result.metric(F1_SCORE).unwrap_or(0.0);
            let precision = result.metric(PRECISION).unwrap_or(0.0);
            let recall = result.metric(RECALL).unwrap_or(0.0);

            if accuracy > 0.9 {
                strengths.push("Excellent accuracy");
            } else if accuracy > 0.8 {
                strengths.push("Good accuracy");
            } else {
                weaknesses.push("Low accuracy");
            }
            if f1 > 0.85 {
                strengths.push("Well-balanced precision and recall");
            } else if f1 < 0.7 {
                weaknesses.push("Poor balance between precision and recall");
            }

            if accuracy < 0.8 {
                recommendations.push("Consider hyperparameter tuning to improve accuracy");
            }
            if precision > recall + 0.1 {
                recommendations.push(
                    "Model has high precision but low recall - consider adjusting decision threshold",
                );
            } else if recall > precision + 0.1 {
                recommendations
                    .push("Model has high recall but low precision - consider feature selection");
            }
        }
        ProblemType::Regression => {
            let r2 = result.metric(R2_SCORE).unwrap_or(0.0);
            let mape = match &result.diagnostics {
                Some(Diagnostics::Regression { mape: Some(m), .. }) => *m,
                _ => f64::INFINITY,
            };

            if r2 > 0.9 {
                strengths.push("Excellent explanatory power");
            } else if r2 > 0.7 {
                strengths.push("Good explanatory power");
            } else {
                weaknesses.push("Low explanatory power");
            }
            if mape < 5.0 {
                strengths.push("Very low prediction error");
            } else if mape < 15.0 {
                strengths.push("Acceptable prediction error");
            } else {
                weaknesses.push("High prediction error");
            }

            if r2 < 0.7 {
                recommendations.push("Consider adding polynomial features or interaction terms");
            }
            if mape > 15.0 {
                recommendations
                    .push("High prediction error - consider outlier removal or feature scaling");
            }
        }
    }

    if result.training_time_seconds < 1.0 {
        strengths.push("Very fast training");
    } else if result.training_time_seconds > 30.0 {
        weaknesses.push("Slow training time");
    }

    match kind_of(&result.model_name) {
        Some(ModelKind::LinearRegression | ModelKind::LogisticRegression) => {
            recommendations.push("Consider feature scaling for better performance");
        }
        Some(ModelKind::RandomForest) => {
            recommendations.push("Try tuning n_estimators and max_depth parameters");
        }
        Some(ModelKind::Xgboost | ModelKind::Lightgbm) => {
            recommendations.push("Consider early stopping and learning rate tuning");
        }
        _ => {}
    }

    let mut features: Vec<FeatureScore> = result
        .feature_importance
        .iter()
        .map(|(feature, importance)| FeatureScore {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    features.sort_by(|a, b| b.importance.abs().total_cmp(&a.importance.abs()));
    features.truncate(TOP_FEATURES);

    let owned = |v: Vec<&str>| -> Vec<String> { v.into_iter().map(str::to_string).collect() };
    Some(ModelReport {
        model_name: result.model_name.clone(),
        training_time: result.training_time_seconds,
        strengths: owned(strengths),
        weaknesses: owned(weaknesses),
        top_features: features,
        recommendations: owned(recommendations),
    })
}
