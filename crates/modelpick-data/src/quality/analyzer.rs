use crate::error::Result;
use crate::types::{ColumnKind, QualityReport};
use crate::utils::{get_series, non_null_f64, sample_variance, unique_ratio};
use polars::prelude::*;
use tracing::debug;

const HIGH_MISSING_RATIO: f64 = 0.10;
const MODERATE_MISSING_RATIO: f64 = 0.05;
const HIGH_DUPLICATE_RATIO: f64 = 0.10;
const MODERATE_DUPLICATE_RATIO: f64 = 0.05;
const LOW_VARIANCE: f64 = 1e-6;
const HIGH_CARDINALITY_RATIO: f64 = 0.8;

const HIGH_MISSING_PENALTY: f64 = 20.0;
const MODERATE_MISSING_PENALTY: f64 = 10.0;
const HIGH_DUPLICATE_PENALTY: f64 = 15.0;
const MODERATE_DUPLICATE_PENALTY: f64 = 8.0;
const LOW_VARIANCE_PENALTY: f64 = 5.0;
const HIGH_CARDINALITY_PENALTY: f64 = 10.0;

/// Inputs shared with the profiler so counts are computed once.
pub struct QualityInputs<'a> {
    pub total_missing: usize,
    pub duplicate_rows: usize,
    pub columns: &'a [(String, ColumnKind)],
}

/// Scores dataset quality from 100 down, one deduction per detected issue.
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn assess(df: &DataFrame, inputs: &QualityInputs<'_>) -> Result<QualityReport> {
        let mut report = QualityReport::default();
        let rows = df.height();
        let cells = rows * df.width();

        let missing_ratio = if cells > 0 {
            inputs.total_missing as f64 / cells as f64
        } else {
            0.0
        };
        if missing_ratio > HIGH_MISSING_RATIO {
            Self::deduct(
                &mut report,
                HIGH_MISSING_PENALTY,
                format!("High missing values: {}", format_ratio(missing_ratio)),
            );
        } else if missing_ratio > MODERATE_MISSING_RATIO {
            Self::deduct(
                &mut report,
                MODERATE_MISSING_PENALTY,
                format!("Moderate missing values: {}", format_ratio(missing_ratio)),
            );
        }

        let duplicate_ratio = if rows > 0 {
            inputs.duplicate_rows as f64 / rows as f64
        } else {
            0.0
        };
        if duplicate_ratio > HIGH_DUPLICATE_RATIO {
            Self::deduct(
                &mut report,
                HIGH_DUPLICATE_PENALTY,
                format!("High duplicate rows: {}", format_ratio(duplicate_ratio)),
            );
        } else if duplicate_ratio > MODERATE_DUPLICATE_RATIO {
            Self::deduct(
                &mut report,
                MODERATE_DUPLICATE_PENALTY,
                format!("Moderate duplicate rows: {}", format_ratio(duplicate_ratio)),
            );
        }

        let mut low_variance = Vec::new();
        let mut high_cardinality = Vec::new();
        for (name, kind) in inputs.columns {
            let series = get_series(df, name)?;
            match kind {
                ColumnKind::Numeric => {
                    let values = non_null_f64(series)?;
                    if sample_variance(&values).is_some_and(|v| v < LOW_VARIANCE) {
                        low_variance.push(name.clone());
                    }
                }
                ColumnKind::Categorical => {
                    if unique_ratio(series)? > HIGH_CARDINALITY_RATIO {
                        high_cardinality.push(name.clone());
                    }
                }
                ColumnKind::Datetime => {}
            }
        }

        for name in &low_variance {
            Self::deduct(
                &mut report,
                LOW_VARIANCE_PENALTY,
                format!("Low variance column: {name}"),
            );
        }
        for name in &high_cardinality {
            Self::deduct(
                &mut report,
                HIGH_CARDINALITY_PENALTY,
                format!("High cardinality column: {name}"),
            );
        }

        report.score = report.score.max(0.0);
        report.recommendations = recommendations_for(&report.issues);
        debug!(
            score = report.score,
            issues = report.issues.len(),
            "Data quality assessed"
        );
        Ok(report)
    }

    fn deduct(report: &mut QualityReport, penalty: f64, issue: String) {
        report.score -= penalty;
        report.issues.push(issue);
    }
}

/// One recommendation per issue, matched on the issue wording. Column
/// issues name their column in the recommendation.
pub fn recommendations_for(issues: &[String]) -> Vec<String> {
    issues
        .iter()
        .filter_map(|issue| {
            let lower = issue.to_lowercase();
            let column = issue.split_once(": ").map(|(_, c)| c);
            let text = if lower.contains("missing values") {
                "Consider imputation strategies for missing values".to_string()
            } else if lower.contains("duplicate") {
                "Remove duplicate rows to improve data quality".to_string()
            } else if lower.contains("low variance") {
                format!("Consider removing low variance column '{}'", column?)
            } else if lower.contains("high cardinality") {
                format!(
                    "Consider encoding or grouping high cardinality column '{}'",
                    column?
                )
            } else {
                return None;
            };
            Some(text)
        })
        .collect()
}

fn format_ratio(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::series_kind;

    fn columns(df: &DataFrame) -> Vec<(String, ColumnKind)> {
        df.get_columns()
            .iter()
            .map(|c| (c.name().to_string(), series_kind(c.as_materialized_series())))
            .collect()
    }

    fn assess(df: &DataFrame, total_missing: usize, duplicate_rows: usize) -> QualityReport {
        let cols = columns(df);
        let inputs = QualityInputs {
            total_missing,
            duplicate_rows,
            columns: &cols,
        };
        QualityAnalyzer::assess(df, &inputs).unwrap()
    }

    #[test]
    fn test_clean_dataset_scores_100() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0],
            "b" => ["x", "y", "x", "y"],
        ]
        .unwrap();
        let report = assess(&df, 0, 0);
        assert_eq!(report.score, 100.0);
        assert!(report.issues.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_high_missing_deduction() {
        let df = df![
            "a" => [Some(1.0), None, None, Some(4.0)],
            "b" => [Some(1.0), Some(2.0), Some(3.0), Some(5.0)],
        ]
        .unwrap();
        let report = assess(&df, 2, 0);
        assert_eq!(report.score, 80.0);
        assert_eq!(report.issues[0], "High missing values: 25.0%");
        assert_eq!(
            report.recommendations[0],
            "Consider imputation strategies for missing values"
        );
    }

    #[test]
    fn test_low_variance_and_cardinality() {
        let df = df![
            "constant" => [5.0, 5.0, 5.0, 5.0, 5.0],
            "id" => ["a", "b", "c", "d", "e"],
            "ok" => [1.0, 2.0, 3.0, 4.0, 5.0],
        ]
        .unwrap();
        let report = assess(&df, 0, 0);
        assert_eq!(report.score, 85.0);
        assert_eq!(report.issues[0], "Low variance column: constant");
        assert_eq!(report.issues[1], "High cardinality column: id");
        assert_eq!(
            report.recommendations,
            vec![
                "Consider removing low variance column 'constant'".to_string(),
                "Consider encoding or grouping high cardinality column 'id'".to_string(),
            ]
        );
    }

    #[test]
    fn test_one_issue_per_flagged_column() {
        let df = df![
            "zeros" => [0.0, 0.0, 0.0, 0.0, 0.0],
            "ones" => [1.0, 1.0, 1.0, 1.0, 1.0],
            "code" => ["a", "b", "c", "d", "e"],
            "name" => ["p", "q", "r", "s", "t"],
        ]
        .unwrap();
        let report = assess(&df, 0, 0);
        assert_eq!(
            report.issues,
            vec![
                "Low variance column: zeros".to_string(),
                "Low variance column: ones".to_string(),
                "High cardinality column: code".to_string(),
                "High cardinality column: name".to_string(),
            ]
        );
        assert_eq!(report.score, 100.0 - 2.0 * 5.0 - 2.0 * 10.0);
        assert_eq!(report.recommendations.len(), report.issues.len());
    }

    #[test]
    fn test_score_floor_at_zero() {
        let n = 10;
        let mut cols = Vec::new();
        for i in 0..12 {
            let values: Vec<String> = (0..n).map(|r| format!("v{i}_{r}")).collect();
            cols.push(Column::new(format!("c{i}").into(), values));
        }
        let df = DataFrame::new(cols).unwrap();
        let report = assess(&df, 0, 0);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.issues.len(), 12);
    }

    #[test]
    fn test_single_value_column_not_flagged() {
        let df = df!["a" => [Some(1.0), None]].unwrap();
        let cols = columns(&df);
        let inputs = QualityInputs {
            total_missing: 0,
            duplicate_rows: 0,
            columns: &cols,
        };
        let report = QualityAnalyzer::assess(&df, &inputs).unwrap();
        assert!(report.issues.iter().all(|i| !i.contains("Low variance")));
    }

    #[test]
    fn test_recommendations_mapping() {
        let issues = vec![
            "Moderate duplicate rows: 6.0%".to_string(),
            "Unrelated".to_string(),
        ];
        assert_eq!(
            recommendations_for(&issues),
            vec!["Remove duplicate rows to improve data quality".to_string()]
        );
    }
}
