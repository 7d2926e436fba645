//! Shared utilities for profiling and preprocessing.
//!
//! Column typing, value extraction, and the small statistical helpers that
//! the profiler, the preprocessor, and the problem-type classifier share.

use crate::error::{DataError, Result};
use crate::types::ColumnKind;
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Semantic kind of a dtype. Booleans, strings, and anything unrecognised
/// are categorical.
pub fn column_kind(dtype: &DataType) -> ColumnKind {
    if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else if is_datetime_dtype(dtype) {
        ColumnKind::Datetime
    } else {
        ColumnKind::Categorical
    }
}

/// Semantic kind of a Series.
pub fn series_kind(series: &Series) -> ColumnKind {
    column_kind(series.dtype())
}

/// Get a column from the frame as a materialized Series.
///
/// A missing column reports the frame's columns in
/// [`DataError::ColumnNotFound`].
pub fn get_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| DataError::ColumnNotFound {
            column: name.to_string(),
            available: df
                .get_column_names()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        })
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Cast a numeric or datetime Series to f64, keeping nulls.
///
/// Datetime columns go through their physical integer representation.
pub fn to_f64_options(series: &Series) -> Result<Vec<Option<f64>>> {
    let physical = if is_datetime_dtype(series.dtype()) {
        series.to_physical_repr().into_owned()
    } else {
        series.clone()
    };
    let cast = physical
        .cast(&DataType::Float64)
        .map_err(|e| DataError::TypeConversionFailed {
            column: series.name().to_string(),
            target_type: "Float64".to_string(),
            reason: e.to_string(),
        })?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Non-null values of a Series as f64, NaN excluded.
pub fn non_null_f64(series: &Series) -> Result<Vec<f64>> {
    Ok(to_f64_options(series)?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Cast any Series to strings, keeping nulls.
pub fn to_string_options(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series
        .cast(&DataType::String)
        .map_err(|e| DataError::TypeConversionFailed {
            column: series.name().to_string(),
            target_type: "String".to_string(),
            reason: e.to_string(),
        })?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Number of distinct non-null values.
pub fn unique_count(series: &Series) -> Result<usize> {
    Ok(series.drop_nulls().n_unique()?)
}

/// Distinct non-null values over the total length (nulls included).
pub fn unique_ratio(series: &Series) -> Result<f64> {
    if series.is_empty() {
        return Ok(0.0);
    }
    Ok(unique_count(series)? as f64 / series.len() as f64)
}

/// Counts of each distinct non-null value, most frequent first.
///
/// Ties keep first-appearance order.
pub fn value_counts(series: &Series) -> Result<Vec<(String, usize)>> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for value in to_string_options(series)?.into_iter().flatten() {
        match index.get(&value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

// =============================================================================
// Statistics
// =============================================================================

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (ddof = 1), `None` with fewer than two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Sample standard deviation (ddof = 1).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Quantile of already-sorted values with linear interpolation.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentage helper that returns 0 for an empty denominator.
#[inline]
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind() {
        assert_eq!(column_kind(&DataType::Int64), ColumnKind::Numeric);
        assert_eq!(column_kind(&DataType::Float32), ColumnKind::Numeric);
        assert_eq!(column_kind(&DataType::String), ColumnKind::Categorical);
        assert_eq!(column_kind(&DataType::Boolean), ColumnKind::Categorical);
        assert_eq!(column_kind(&DataType::Date), ColumnKind::Datetime);
    }

    #[test]
    fn test_unique_ratio_ignores_nulls() {
        let s = Series::new("a".into(), &[Some(1i64), Some(1), None, Some(2)]);
        assert_eq!(unique_count(&s).unwrap(), 2);
        assert!((unique_ratio(&s).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_value_counts_order() {
        let s = Series::new("a".into(), &["b", "a", "a", "c", "b", "a"]);
        let counts = value_counts(&s).unwrap();
        assert_eq!(counts[0], ("a".to_string(), 3));
        assert_eq!(counts[1], ("b".to_string(), 2));
        assert_eq!(counts[2], ("c".to_string(), 1));
    }

    #[test]
    fn test_quantile_linear() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&v, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&v, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&v, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&v, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_sample_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let std = sample_std(&v).unwrap();
        assert!((std - 2.138089935).abs() < 1e-6);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_datetime_to_f64() {
        let s = Series::new("d".into(), &[Some(0i64), Some(86_400_000), None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let values = to_f64_options(&s).unwrap();
        assert_eq!(values, vec![Some(0.0), Some(86_400_000.0), None]);
    }

    #[test]
    fn test_percent_empty() {
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn test_get_series_lists_available_columns() {
        let df = df!("age" => [1i64, 2], "city" => ["a", "b"]).unwrap();
        assert_eq!(get_series(&df, "age").unwrap().len(), 2);
        match get_series(&df, "income") {
            Err(DataError::ColumnNotFound { column, available }) => {
                assert_eq!(column, "income");
                assert_eq!(available, vec!["age".to_string(), "city".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
