//! Evaluation metrics and per-result diagnostics.
//!
//! Every metric leaves this module through [`finite_or_null`], so a
//! [`MetricMap`] never holds NaN or an infinity.
//!
//! # Metric keys
//!
//! | Problem type | Keys |
//! |---|---|
//! | classification | `train_accuracy`, `test_accuracy`, `precision`, `recall`, `f1_score` |
//! | regression | `train_mse`, `test_mse`, `train_mae`, `test_mae`, `r2_score` |
//!
//! Precision, recall and F1 are support-weighted over the classes of the
//! test split; a zero denominator counts as 0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric name to value; `None` serialises as `null`.
pub type MetricMap = BTreeMap<String, Option<f64>>;

pub const TRAIN_ACCURACY: &str = "train_accuracy";
pub const TEST_ACCURACY: &str = "test_accuracy";
pub const PRECISION: &str = "precision";
pub const RECALL: &str = "recall";
pub const F1_SCORE: &str = "f1_score";
pub const TRAIN_MSE: &str = "train_mse";
pub const TEST_MSE: &str = "test_mse";
pub const TRAIN_MAE: &str = "train_mae";
pub const TEST_MAE: &str = "test_mae";
pub const R2_SCORE: &str = "r2_score";

/// `Some(value)` for finite values, `None` otherwise.
pub fn finite_or_null(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn metric_map<'a>(entries: impl IntoIterator<Item = (&'a str, Option<f64>)>) -> MetricMap {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.and_then(finite_or_null)))
        .collect()
}

// ============================================================================
// Classification
// ============================================================================

/// Fraction of matching labels; `None` for empty input.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> Option<f64> {
    if truth.is_empty() {
        return None;
    }
    let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Some(hits as f64 / truth.len() as f64)
}

/// Weighted precision, recall and F1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

pub fn weighted_scores(truth: &[usize], predicted: &[usize]) -> WeightedScores {
    let mut support: BTreeMap<usize, usize> = BTreeMap::new();
    for &t in truth {
        *support.entry(t).or_default() += 1;
    }
    let total: usize = support.values().sum();
    if total == 0 {
        return WeightedScores {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }

    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for (&class, &count) in &support {
        let tp = truth
            .iter()
            .zip(predicted)
            .filter(|(t, p)| **t == class && **p == class)
            .count();
        let predicted_pos = predicted.iter().filter(|p| **p == class).count();

        let p = ratio(tp, predicted_pos);
        let r = ratio(tp, count);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

        let weight = count as f64 / total as f64;
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }
    WeightedScores {
        precision,
        recall,
        f1,
    }
}

/// Classification metrics for a fitted model.
pub fn classification_metrics(
    train_truth: &[usize],
    train_pred: &[usize],
    test_truth: &[usize],
    test_pred: &[usize],
) -> MetricMap {
    let scores = weighted_scores(test_truth, test_pred);
    metric_map([
        (TRAIN_ACCURACY, accuracy(train_truth, train_pred)),
        (TEST_ACCURACY, accuracy(test_truth, test_pred)),
        (PRECISION, Some(scores.precision)),
        (RECALL, Some(scores.recall)),
        (F1_SCORE, Some(scores.f1)),
    ])
}

// ============================================================================
// Regression
// ============================================================================

pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> Option<f64> {
    mean(truth.iter().zip(predicted).map(|(t, p)| (t - p).powi(2)))
}

pub fn mean_absolute_error(truth: &[f64], predicted: &[f64]) -> Option<f64> {
    mean(truth.iter().zip(predicted).map(|(t, p)| (t - p).abs()))
}

/// Coefficient of determination. Undefined (`None`) for fewer than two
/// samples or a constant target.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> Option<f64> {
    if truth.len() < 2 {
        return None;
    }
    let avg = mean(truth.iter().copied())?;
    let ss_tot: f64 = truth.iter().map(|t| (t - avg).powi(2)).sum();
    if ss_tot == 0.0 {
        return None;
    }
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Regression metrics for a fitted model.
pub fn regression_metrics(
    train_truth: &[f64],
    train_pred: &[f64],
    test_truth: &[f64],
    test_pred: &[f64],
) -> MetricMap {
    metric_map([
        (TRAIN_MSE, mean_squared_error(train_truth, train_pred)),
        (TEST_MSE, mean_squared_error(test_truth, test_pred)),
        (TRAIN_MAE, mean_absolute_error(train_truth, train_pred)),
        (TEST_MAE, mean_absolute_error(test_truth, test_pred)),
        (R2_SCORE, r2_score(test_truth, test_pred)),
    ])
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Mean, population standard deviation and range of a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SummaryStats {
    pub fn of(values: &[f64]) -> Self {
        let avg = mean(values.iter().copied());
        let std = avg.and_then(|m| {
            mean(values.iter().map(|v| (v - m).powi(2))).map(f64::sqrt)
        });
        Self {
            mean: avg.and_then(finite_or_null),
            std: std.and_then(finite_or_null),
            min: values.iter().copied().reduce(f64::min).and_then(finite_or_null),
            max: values.iter().copied().reduce(f64::max).and_then(finite_or_null),
        }
    }
}

/// Per-class precision, recall and F1 on the test split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

pub const MACRO_AVG: &str = "macro avg";
pub const WEIGHTED_AVG: &str = "weighted avg";

/// Extra detail on the test split, beyond the headline metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostics {
    Classification {
        /// Label names, indexing both axes of the matrix.
        labels: Vec<String>,
        /// Rows are true labels, columns predicted labels.
        confusion_matrix: Vec<Vec<usize>>,
        class_distribution: BTreeMap<String, usize>,
        /// ROC AUC from class scores; one-vs-rest, support-weighted for
        /// more than two classes. `None` without scores.
        auc_score: Option<f64>,
        /// Keyed by label name, plus `macro avg` and `weighted avg`.
        classification_report: BTreeMap<String, ClassReport>,
    },
    Regression {
        rmse: Option<f64>,
        /// Mean absolute percentage error over non-zero true values, in percent.
        mape: Option<f64>,
        /// Over `truth - predicted`.
        residuals: SummaryStats,
        target_stats: SummaryStats,
    },
}

/// Class scores of a fitted classifier: `rows[i][k]` scores `classes[k]`
/// for sample `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities {
    pub classes: Vec<usize>,
    pub rows: Vec<Vec<f64>>,
}

impl ClassProbabilities {
    fn column(&self, class: usize) -> Option<Vec<f64>> {
        let k = self.classes.iter().position(|&c| c == class)?;
        self.rows.iter().map(|row| row.get(k).copied()).collect()
    }
}

/// Area under the ROC curve for one positive class, from the rank-sum
/// statistic with tied scores sharing their average rank.
pub fn binary_auc(positive: &[bool], scores: &[f64]) -> Option<f64> {
    if positive.len() != scores.len() || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let n_pos = positive.iter().filter(|p| **p).count();
    let n_neg = positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += order[i..=j].iter().filter(|&&k| positive[k]).count() as f64 * avg_rank;
        i = j + 1;
    }
    let n_pos = n_pos as f64;
    Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// ROC AUC over the classes present in `truth`. Two classes score the
/// larger label; more take the support-weighted one-vs-rest mean. `None`
/// for a single class or when a present class has no score column.
pub fn roc_auc(truth: &[usize], scores: &ClassProbabilities) -> Option<f64> {
    if truth.is_empty() || scores.rows.len() != truth.len() {
        return None;
    }
    let mut support: BTreeMap<usize, usize> = BTreeMap::new();
    for &t in truth {
        *support.entry(t).or_default() += 1;
    }
    let present: Vec<usize> = support.keys().copied().collect();
    let one_vs_rest = |class: usize| -> Option<f64> {
        let positive: Vec<bool> = truth.iter().map(|&t| t == class).collect();
        binary_auc(&positive, &scores.column(class)?)
    };

    match present.as_slice() {
        [] | [_] => None,
        [_, positive] => one_vs_rest(*positive),
        _ => {
            let mut total = 0.0;
            for (&class, &count) in &support {
                total += one_vs_rest(class)? * count as f64;
            }
            Some(total / truth.len() as f64)
        }
    }
}

/// Per-class scores for every label seen in `truth` or `predicted`, with
/// their macro and support-weighted averages.
pub fn classification_report(
    names: &[String],
    truth: &[usize],
    predicted: &[usize],
) -> BTreeMap<String, ClassReport> {
    let mut classes: Vec<usize> = truth.iter().chain(predicted).copied().collect();
    classes.sort_unstable();
    classes.dedup();

    let mut report = BTreeMap::new();
    let (mut macro_avg, mut weighted) = ([0.0; 3], [0.0; 3]);
    for &class in &classes {
        let tp = truth
            .iter()
            .zip(predicted)
            .filter(|(t, p)| **t == class && **p == class)
            .count();
        let support = truth.iter().filter(|t| **t == class).count();
        let predicted_pos = predicted.iter().filter(|p| **p == class).count();
        let precision = ratio(tp, predicted_pos);
        let recall = ratio(tp, support);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        for (acc, v) in macro_avg.iter_mut().zip([precision, recall, f1_score]) {
            *acc += v;
        }
        for (acc, v) in weighted.iter_mut().zip([precision, recall, f1_score]) {
            *acc += v * support as f64;
        }
        let name = names
            .get(class)
            .cloned()
            .unwrap_or_else(|| class.to_string());
        report.insert(
            name,
            ClassReport {
                precision,
                recall,
                f1_score,
                support,
            },
        );
    }

    if classes.is_empty() {
        return report;
    }
    let n_classes = classes.len() as f64;
    let total = truth.len();
    let averaged = |sums: [f64; 3], den: f64| ClassReport {
        precision: if den > 0.0 { sums[0] / den } else { 0.0 },
        recall: if den > 0.0 { sums[1] / den } else { 0.0 },
        f1_score: if den > 0.0 { sums[2] / den } else { 0.0 },
        support: total,
    };
    report.insert(MACRO_AVG.to_string(), averaged(macro_avg, n_classes));
    report.insert(WEIGHTED_AVG.to_string(), averaged(weighted, total as f64));
    report
}

pub fn classification_diagnostics(
    names: &[String],
    truth: &[usize],
    predicted: &[usize],
    scores: Option<&ClassProbabilities>,
) -> Diagnostics {
    let n = names.len();
    let mut matrix = vec![vec![0usize; n]; n];
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < n && p < n {
            matrix[t][p] += 1;
        }
        if let Some(name) = names.get(t) {
            *distribution.entry(name.clone()).or_default() += 1;
        }
    }
    Diagnostics::Classification {
        labels: names.to_vec(),
        confusion_matrix: matrix,
        class_distribution: distribution,
        auc_score: scores
            .and_then(|s| roc_auc(truth, s))
            .and_then(finite_or_null),
        classification_report: classification_report(names, truth, predicted),
    }
}

pub fn regression_diagnostics(truth: &[f64], predicted: &[f64]) -> Diagnostics {
    let residuals: Vec<f64> = truth.iter().zip(predicted).map(|(t, p)| t - p).collect();

    let rmse = mean_squared_error(truth, predicted).map(f64::sqrt);
    let mape = mean(
        truth
            .iter()
            .zip(predicted)
            .filter(|(t, _)| **t != 0.0)
            .map(|(t, p)| ((t - p) / t).abs() * 100.0),
    );

    Diagnostics::Regression {
        rmse: rmse.and_then(finite_or_null),
        mape: mape.and_then(finite_or_null),
        residuals: SummaryStats::of(&residuals),
        target_stats: SummaryStats::of(truth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_finite_or_null() {
        assert_eq!(finite_or_null(1.5), Some(1.5));
        assert_eq!(finite_or_null(f64::NAN), None);
        assert_eq!(finite_or_null(f64::INFINITY), None);
        assert_eq!(finite_or_null(f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]), Some(0.75));
        assert_eq!(accuracy(&[], &[]), None);
    }

    #[test]
    fn test_weighted_scores() {
        // class 0: support 3, tp 2, predicted 2 -> p 1.0, r 2/3
        // class 1: support 1, tp 1, predicted 2 -> p 0.5, r 1.0
        let truth = [0, 0, 0, 1];
        let pred = [0, 0, 1, 1];
        let s = weighted_scores(&truth, &pred);
        assert!(close(s.precision, 0.75 * 1.0 + 0.25 * 0.5));
        assert!(close(s.recall, 0.75 * (2.0 / 3.0) + 0.25 * 1.0));
        let f0 = 2.0 * (2.0 / 3.0) / (1.0 + 2.0 / 3.0);
        let f1 = 2.0 * 0.5 / 1.5;
        assert!(close(s.f1, 0.75 * f0 + 0.25 * f1));
    }

    #[test]
    fn test_zero_division_is_zero() {
        // class 1 is never predicted
        let s = weighted_scores(&[1, 1], &[0, 0]);
        assert_eq!(s.precision, 0.0);
        assert_eq!(s.recall, 0.0);
        assert_eq!(s.f1, 0.0);
    }

    #[test]
    fn test_classification_keys() {
        let m = classification_metrics(&[0, 1], &[0, 1], &[1], &[1]);
        let keys: Vec<&str> = m.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["f1_score", "precision", "recall", "test_accuracy", "train_accuracy"]
        );
        assert_eq!(m[TEST_ACCURACY], Some(1.0));
    }

    #[test]
    fn test_r2_undefined_for_constant_target() {
        assert_eq!(r2_score(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(r2_score(&[2.0], &[2.0]), None);
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), Some(1.0));
    }

    #[test]
    fn test_regression_metrics_are_finite_or_null() {
        let m = regression_metrics(&[1.0, 2.0], &[1.0, f64::INFINITY], &[3.0, 3.0], &[2.0, 4.0]);
        assert_eq!(m[TRAIN_MSE], None);
        assert_eq!(m[TEST_MSE], Some(1.0));
        assert_eq!(m[TEST_MAE], Some(1.0));
        assert_eq!(m[R2_SCORE], None);
        assert!(m.values().all(|v| v.is_none_or(f64::is_finite)));
    }

    #[test]
    fn test_confusion_matrix() {
        let names = vec!["a".to_string(), "b".to_string()];
        let Diagnostics::Classification {
            confusion_matrix,
            class_distribution,
            ..
        } = classification_diagnostics(&names, &[0, 0, 1], &[0, 1, 1], None)
        else {
            panic!("expected classification diagnostics");
        };
        assert_eq!(confusion_matrix, vec![vec![1, 1], vec![0, 1]]);
        assert_eq!(class_distribution["a"], 2);
        assert_eq!(class_distribution["b"], 1);
    }

    #[test]
    fn test_regression_diagnostics() {
        let Diagnostics::Regression {
            rmse,
            mape,
            residuals,
            target_stats,
        } = regression_diagnostics(&[0.0, 10.0, 20.0], &[1.0, 9.0, 22.0])
        else {
            panic!("expected regression diagnostics");
        };
        assert!(close(rmse.unwrap(), (6.0f64 / 3.0).sqrt()));
        // zeros are skipped: (10% + 10%) / 2
        assert!(close(mape.unwrap(), 10.0));
        assert_eq!(residuals.min, Some(-2.0));
        assert_eq!(residuals.max, Some(1.0));
        assert_eq!(target_stats.min, Some(0.0));
        assert_eq!(target_stats.max, Some(20.0));
        assert!(close(target_stats.mean.unwrap(), 10.0));
    }

    #[test]
    fn test_summary_std_is_population() {
        // residuals [-1, 1, -2]: mean -2/3, squared deviations 1/9, 25/9, 16/9
        let stats = SummaryStats::of(&[-1.0, 1.0, -2.0]);
        assert!(close(stats.mean.unwrap(), -2.0 / 3.0));
        assert!(close(stats.std.unwrap(), (42.0f64 / 27.0).sqrt()));

        let single = SummaryStats::of(&[4.0]);
        assert_eq!(single.std, Some(0.0));
        assert_eq!(SummaryStats::of(&[]), SummaryStats::default());
    }

    #[test]
    fn test_binary_auc_with_ties() {
        assert_eq!(
            binary_auc(&[false, false, true, true], &[0.1, 0.4, 0.35, 0.8]),
            Some(0.75)
        );
        // one tied pair between the classes counts half
        assert_eq!(binary_auc(&[false, true], &[0.5, 0.5]), Some(0.5));
        assert_eq!(binary_auc(&[true, true], &[0.1, 0.2]), None);
    }

    #[test]
    fn test_roc_auc_binary_and_multiclass() {
        let binary = ClassProbabilities {
            classes: vec![0, 1],
            rows: vec![
                vec![0.9, 0.1],
                vec![0.6, 0.4],
                vec![0.65, 0.35],
                vec![0.2, 0.8],
            ],
        };
        assert_eq!(roc_auc(&[0, 0, 1, 1], &binary), Some(0.75));

        let perfect = ClassProbabilities {
            classes: vec![0, 1, 2],
            rows: vec![
                vec![0.8, 0.1, 0.1],
                vec![0.1, 0.8, 0.1],
                vec![0.1, 0.1, 0.8],
                vec![0.7, 0.2, 0.1],
            ],
        };
        assert_eq!(roc_auc(&[0, 1, 2, 0], &perfect), Some(1.0));

        let missing_column = ClassProbabilities {
            classes: vec![0, 1],
            rows: vec![vec![1.0, 0.0]; 3],
        };
        assert_eq!(roc_auc(&[0, 1, 2], &missing_column), None);
        assert_eq!(roc_auc(&[1, 1, 1], &missing_column), None);
    }

    #[test]
    fn test_classification_report() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let report = classification_report(&names, &[0, 0, 0, 1], &[0, 0, 1, 1]);
        let keys: Vec<&str> = report.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", MACRO_AVG, WEIGHTED_AVG]);

        assert_eq!(report["a"].support, 3);
        assert!(close(report["a"].recall, 2.0 / 3.0));
        assert!(close(report["b"].precision, 0.5));
        assert!(close(report[MACRO_AVG].precision, 0.75));
        assert_eq!(report[WEIGHTED_AVG].support, 4);

        let weighted = weighted_scores(&[0, 0, 0, 1], &[0, 0, 1, 1]);
        assert!(close(report[WEIGHTED_AVG].f1_score, weighted.f1));
    }

    #[test]
    fn test_diagnostics_auc_from_scores() {
        let names = vec!["no".to_string(), "yes".to_string()];
        let scores = ClassProbabilities {
            classes: vec![0, 1],
            rows: vec![vec![0.7, 0.3], vec![0.2, 0.8]],
        };
        let Diagnostics::Classification { auc_score, .. } =
            classification_diagnostics(&names, &[0, 1], &[0, 1], Some(&scores))
        else {
            panic!("expected classification diagnostics");
        };
        assert_eq!(auc_score, Some(1.0));
    }

    #[test]
    fn test_mape_null_when_truth_all_zero() {
        let Diagnostics::Regression { mape, .. } = regression_diagnostics(&[0.0, 0.0], &[1.0, 2.0])
        else {
            panic!("expected regression diagnostics");
        };
        assert_eq!(mape, None);
    }
}
