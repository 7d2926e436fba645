//! Feature preprocessing: raw columns to a numeric matrix.
//!
//! Categorical and text features are label-encoded over their sorted
//! distinct values (null becomes -1). Numeric and datetime features are cast
//! to `f64` with nulls filled by the column mean, or 0 when the column has no
//! values at all. Encodings are derived fresh on every call.

use crate::error::{DataError, Result, ResultExt};
use crate::types::{ColumnKind, ProblemType};
use crate::utils::{get_series, mean, series_kind, to_f64_options, to_string_options};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Code given to a missing categorical value.
pub const MISSING_CATEGORY_CODE: f64 = -1.0;

/// Row-major numeric feature table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Copy of the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Model-ready target values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetValues {
    /// Class indices into `names`.
    Classes { labels: Vec<usize>, names: Vec<String> },
    Continuous { values: Vec<f64> },
}

impl TargetValues {
    pub fn len(&self) -> usize {
        match self {
            TargetValues::Classes { labels, .. } => labels.len(),
            TargetValues::Continuous { values } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the values at `indices`; class names are kept whole.
    pub fn select(&self, indices: &[usize]) -> TargetValues {
        match self {
            TargetValues::Classes { labels, names } => TargetValues::Classes {
                labels: indices.iter().map(|&i| labels[i]).collect(),
                names: names.clone(),
            },
            TargetValues::Continuous { values } => TargetValues::Continuous {
                values: indices.iter().map(|&i| values[i]).collect(),
            },
        }
    }
}

/// Output of [`FeaturePreprocessor::preprocess`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedData {
    pub features: FeatureMatrix,
    pub target: TargetValues,
    /// Category list per encoded column; a value's code is its index.
    pub encodings: BTreeMap<String, Vec<String>>,
    /// Columns whose missing values were mean-filled.
    pub imputed_columns: Vec<String>,
    /// Rows excluded because the target was null.
    pub dropped_target_rows: usize,
}

pub struct FeaturePreprocessor;

impl FeaturePreprocessor {
    /// Split `df` into encoded features and target values for `problem_type`.
    pub fn preprocess(
        df: &DataFrame,
        target: &str,
        problem_type: ProblemType,
    ) -> Result<PreparedData> {
        if df.height() == 0 {
            return Err(DataError::EmptyDataset);
        }
        let target_series = get_series(df, target)?;
        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|name| name.to_string())
            .collect();
        if feature_names.is_empty() {
            return Err(DataError::NoFeatureColumns(target.to_string()));
        }

        let keep = Self::target_mask(target_series, problem_type)?;
        let kept_rows = keep.iter().filter(|k| **k).count();
        if kept_rows == 0 {
            return Err(DataError::NoValidValues(target.to_string()));
        }
        let dropped_target_rows = df.height() - kept_rows;

        let mut columns_data: Vec<Vec<f64>> = Vec::with_capacity(feature_names.len());
        let mut encodings = BTreeMap::new();
        let mut imputed_columns = Vec::new();

        for name in &feature_names {
            let series = get_series(df, name)?;
            match series_kind(series) {
                ColumnKind::Numeric | ColumnKind::Datetime => {
                    let values =
                        to_f64_options(series).context(format!("Encoding feature '{name}'"))?;
                    let values = filter_kept(values, &keep);
                    let (filled, imputed) = fill_with_mean(values);
                    if imputed {
                        imputed_columns.push(name.clone());
                    }
                    columns_data.push(filled);
                }
                ColumnKind::Categorical => {
                    let values = to_string_options(series)
                        .context(format!("Encoding feature '{name}'"))?;
                    let values = filter_kept(values, &keep);
                    let (codes, categories) = label_encode(&values);
                    encodings.insert(name.clone(), categories);
                    columns_data.push(codes);
                }
            }
        }

        let rows = (0..kept_rows)
            .map(|r| columns_data.iter().map(|col| col[r]).collect())
            .collect();

        let target_values = Self::encode_target(target_series, problem_type, &keep)?;

        debug!(
            rows = kept_rows,
            features = feature_names.len(),
            encoded = encodings.len(),
            dropped_target_rows,
            "Features preprocessed"
        );

        Ok(PreparedData {
            features: FeatureMatrix {
                columns: feature_names,
                rows,
            },
            target: target_values,
            encodings,
            imputed_columns,
            dropped_target_rows,
        })
    }

    /// Rows with a usable target value.
    fn target_mask(series: &Series, problem_type: ProblemType) -> Result<Vec<bool>> {
        match (problem_type, series_kind(series)) {
            (ProblemType::Regression, _) => Ok(to_f64_options(series)?
                .into_iter()
                .map(|v| v.is_some_and(f64::is_finite))
                .collect()),
            (ProblemType::Classification, ColumnKind::Numeric) => Ok(to_f64_options(series)?
                .into_iter()
                .map(|v| v.is_some_and(|x| !x.is_nan()))
                .collect()),
            (ProblemType::Classification, _) => Ok(to_string_options(series)?
                .iter()
                .map(Option::is_some)
                .collect()),
        }
    }

    fn encode_target(
        series: &Series,
        problem_type: ProblemType,
        keep: &[bool],
    ) -> Result<TargetValues> {
        match problem_type {
            ProblemType::Regression => {
                let values = filter_kept(to_f64_options(series)?, keep)
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect();
                Ok(TargetValues::Continuous { values })
            }
            ProblemType::Classification => {
                let names = filter_kept(to_string_options(series)?, keep);
                let names: Vec<String> = names.into_iter().map(Option::unwrap_or_default).collect();

                let mut classes: Vec<String> = names
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if series_kind(series) == ColumnKind::Numeric {
                    classes.sort_by(|a, b| {
                        let a = a.parse::<f64>().unwrap_or(f64::NAN);
                        let b = b.parse::<f64>().unwrap_or(f64::NAN);
                        a.total_cmp(&b)
                    });
                }

                let index: BTreeMap<&str, usize> = classes
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (c.as_str(), i))
                    .collect();
                let labels = names
                    .iter()
                    .map(|n| index.get(n.as_str()).copied().unwrap_or(0))
                    .collect();
                Ok(TargetValues::Classes {
                    labels,
                    names: classes,
                })
            }
        }
    }
}

fn filter_kept<T>(values: Vec<T>, keep: &[bool]) -> Vec<T> {
    values
        .into_iter()
        .zip(keep)
        .filter_map(|(v, k)| k.then_some(v))
        .collect()
}

/// Fill nulls (and NaN) with the column mean, 0 if nothing to average.
fn fill_with_mean(values: Vec<Option<f64>>) -> (Vec<f64>, bool) {
    let present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    let imputed = present.len() < values.len();
    let fill = mean(&present).unwrap_or(0.0);
    let filled = values
        .into_iter()
        .map(|v| match v {
            Some(x) if !x.is_nan() => x,
            _ => fill,
        })
        .collect();
    (filled, imputed)
}

/// Codes over sorted distinct values; null maps to -1.
fn label_encode(values: &[Option<String>]) -> (Vec<f64>, Vec<String>) {
    let categories: Vec<String> = values
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let codes = values
        .iter()
        .map(|v| match v {
            Some(s) => index.get(s.as_str()).map_or(MISSING_CATEGORY_CODE, |&i| i as f64),
            None => MISSING_CATEGORY_CODE,
        })
        .collect();
    (codes, categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_label_encoding_sorted_codes() {
        let df = df![
            "color" => [Some("red"), Some("blue"), None, Some("green"), Some("blue")],
            "y" => [1.0, 2.0, 3.0, 4.0, 5.0],
        ]
        .unwrap();
        let prepared = FeaturePreprocessor::preprocess(&df, "y", ProblemType::Regression).unwrap();
        assert_eq!(prepared.features.columns, vec!["color".to_string()]);
        let codes: Vec<f64> = prepared.features.rows.iter().map(|r| r[0]).collect();
        assert_eq!(codes, vec![2.0, 0.0, -1.0, 1.0, 0.0]);
        assert_eq!(
            prepared.encodings["color"],
            vec!["blue".to_string(), "green".to_string(), "red".to_string()]
        );
    }

    #[test]
    fn test_mean_imputation() {
        let df = df![
            "x" => [Some(1.0), None, Some(3.0)],
            "empty" => [None::<f64>, None, None],
            "y" => ["a", "b", "a"],
        ]
        .unwrap();
        let prepared =
            FeaturePreprocessor::preprocess(&df, "y", ProblemType::Classification).unwrap();
        assert_eq!(prepared.features.rows[1], vec![2.0, 0.0]);
        assert_eq!(
            prepared.imputed_columns,
            vec!["x".to_string(), "empty".to_string()]
        );
    }

    #[test]
    fn test_classification_target_encoding() {
        let df = df![
            "x" => [1.0, 2.0, 3.0, 4.0],
            "y" => [10, 2, 10, 2],
        ]
        .unwrap();
        let prepared =
            FeaturePreprocessor::preprocess(&df, "y", ProblemType::Classification).unwrap();
        match prepared.target {
            TargetValues::Classes { labels, names } => {
                assert_eq!(names, vec!["2".to_string(), "10".to_string()]);
                assert_eq!(labels, vec![1, 0, 1, 0]);
            }
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn test_null_target_rows_dropped() {
        let df = df![
            "x" => [1.0, 2.0, 3.0],
            "y" => [Some(1.5), None, Some(2.5)],
        ]
        .unwrap();
        let prepared = FeaturePreprocessor::preprocess(&df, "y", ProblemType::Regression).unwrap();
        assert_eq!(prepared.dropped_target_rows, 1);
        assert_eq!(prepared.features.n_rows(), 2);
        assert_eq!(
            prepared.target,
            TargetValues::Continuous {
                values: vec![1.5, 2.5]
            }
        );
    }

    #[test]
    fn test_request_errors() {
        let df = df!["y" => [1.0, 2.0]].unwrap();
        let err = FeaturePreprocessor::preprocess(&df, "y", ProblemType::Regression).unwrap_err();
        assert_eq!(err.error_code(), "NO_FEATURE_COLUMNS");

        let err = FeaturePreprocessor::preprocess(&df, "missing", ProblemType::Regression)
            .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");

        let df = df!["x" => [1.0, 2.0], "y" => [None::<f64>, None]].unwrap();
        let err = FeaturePreprocessor::preprocess(&df, "y", ProblemType::Regression).unwrap_err();
        assert_eq!(err.error_code(), "NO_VALID_VALUES");
    }

    #[test]
    fn test_select_rows() {
        let matrix = FeatureMatrix {
            columns: vec!["a".to_string()],
            rows: vec![vec![1.0], vec![2.0], vec![3.0]],
        };
        let picked = matrix.select_rows(&[2, 0]);
        assert_eq!(picked.rows, vec![vec![3.0], vec![1.0]]);
    }
}
