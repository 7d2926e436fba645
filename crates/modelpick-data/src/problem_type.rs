//! Classification vs regression from the target column.

use crate::error::{DataError, Result};
use crate::types::{ColumnKind, ProblemType};
use crate::utils::{get_series, series_kind, unique_ratio};
use polars::prelude::*;

/// Numeric targets above this distinct-value ratio are regression targets.
pub const REGRESSION_UNIQUE_RATIO: f64 = 0.05;

/// Decide the problem type implied by `target`.
///
/// A numeric target whose distinct non-null values exceed 5% of the row
/// count is regression; everything else is classification.
pub fn classify(df: &DataFrame, target: &str) -> Result<ProblemType> {
    if df.height() == 0 {
        return Err(DataError::EmptyDataset);
    }
    let series = get_series(df, target)?;
    classify_series(series)
}

/// Same rule applied directly to a Series.
pub fn classify_series(series: &Series) -> Result<ProblemType> {
    if series_kind(series) == ColumnKind::Numeric && unique_ratio(series)? > REGRESSION_UNIQUE_RATIO
    {
        Ok(ProblemType::Regression)
    } else {
        Ok(ProblemType::Classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_high_cardinality_is_regression() {
        let df = df![
            "y" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 9.0],
            "x" => [0, 1, 0, 1, 0, 1, 0, 1, 0, 1],
        ]
        .unwrap();
        assert_eq!(classify(&df, "y").unwrap(), ProblemType::Regression);
    }

    #[test]
    fn test_text_target_is_classification() {
        let df = df![
            "y" => ["a", "b", "c", "a", "b", "c", "a", "b", "c", "a"],
        ]
        .unwrap();
        assert_eq!(classify(&df, "y").unwrap(), ProblemType::Classification);
    }

    #[test]
    fn test_low_ratio_numeric_is_classification() {
        let values: Vec<i64> = (0..100).map(|i| i % 3).collect();
        let df = df!["y" => values].unwrap();
        assert_eq!(classify(&df, "y").unwrap(), ProblemType::Classification);
    }

    #[test]
    fn test_boolean_target_is_classification() {
        let df = df!["y" => [true, false, true, false]].unwrap();
        assert_eq!(classify(&df, "y").unwrap(), ProblemType::Classification);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let df = df!["y" => [1.5, 2.5, 3.5, 1.5]].unwrap();
        let first = classify(&df, "y").unwrap();
        for _ in 0..5 {
            assert_eq!(classify(&df, "y").unwrap(), first);
        }
    }

    #[test]
    fn test_missing_column() {
        let df = df!["y" => [1, 2]].unwrap();
        let err = classify(&df, "nope").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_empty_dataset() {
        let df = DataFrame::empty();
        assert!(matches!(classify(&df, "y"), Err(DataError::EmptyDataset)));
    }
}
