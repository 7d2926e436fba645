//! Data profiling module for dataset analysis.
//!
//! This module provides functionality for profiling datasets, including:
//! - Column typing and missing-value analysis
//! - Summary statistics and categorical distributions
//! - Data-quality scoring
//! - Target-column candidate ranking

mod statistics;
mod targets;

use crate::error::{DataError, Result};
use crate::quality::{QualityAnalyzer, QualityInputs};
use crate::types::{ColumnKind, DatasetProfile};
use crate::utils::{get_series, percent, series_kind};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use statistics::{categorical_summary, numeric_summary};
use targets::rank_target_candidates;

/// Data profiler for analyzing dataset structure and characteristics.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile a dataset. Never fails: an analysis error yields a degraded
    /// profile with `quality_score` 0 and the message in `error`.
    pub fn profile(df: &DataFrame) -> DatasetProfile {
        match Self::try_profile(df) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Dataset profiling failed");
                DatasetProfile::failed(
                    df.height(),
                    df.width(),
                    format!("Error analyzing dataset: {e}"),
                )
            }
        }
    }

    /// Profile a dataset, surfacing the first analysis error.
    pub fn try_profile(df: &DataFrame) -> Result<DatasetProfile> {
        let rows = df.height();
        let columns: Vec<(String, ColumnKind)> = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), series_kind(c.as_materialized_series())))
            .collect();

        let mut column_types = BTreeMap::new();
        let mut missing_by_column = BTreeMap::new();
        let mut missing_percent_by_column = BTreeMap::new();
        let mut numeric_summary_map = BTreeMap::new();
        let mut categorical_summary_map = BTreeMap::new();
        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();
        let mut datetime_columns = Vec::new();
        let mut total_missing = 0;

        for (name, kind) in &columns {
            let series = get_series(df, name)?;
            let nulls = series.null_count();
            total_missing += nulls;
            column_types.insert(name.clone(), *kind);
            missing_by_column.insert(name.clone(), nulls);
            missing_percent_by_column.insert(name.clone(), percent(nulls, rows));

            match kind {
                ColumnKind::Numeric => {
                    numeric_columns.push(name.clone());
                    numeric_summary_map.insert(name.clone(), numeric_summary(series)?);
                }
                ColumnKind::Categorical => {
                    categorical_columns.push(name.clone());
                    categorical_summary_map.insert(name.clone(), categorical_summary(series)?);
                }
                ColumnKind::Datetime => datetime_columns.push(name.clone()),
            }
        }

        let duplicate_rows = Self::duplicate_rows(df)?;
        let quality = QualityAnalyzer::assess(
            df,
            &QualityInputs {
                total_missing,
                duplicate_rows,
                columns: &columns,
            },
        )?;
        let target_candidates = rank_target_candidates(df)?;

        info!(
            rows,
            columns = columns.len(),
            quality_score = quality.score,
            "Dataset profiled"
        );

        Ok(DatasetProfile {
            row_count: rows,
            column_count: columns.len(),
            column_types,
            numeric_columns,
            categorical_columns,
            datetime_columns,
            total_missing,
            missing_by_column,
            missing_percent_by_column,
            duplicate_rows,
            numeric_summary: numeric_summary_map,
            categorical_summary: categorical_summary_map,
            quality_score: quality.score,
            quality_issues: quality.issues,
            recommendations: quality.recommendations,
            target_candidates,
            error: None,
        })
    }

    fn duplicate_rows(df: &DataFrame) -> Result<usize> {
        if df.height() == 0 || df.width() == 0 {
            return Ok(0);
        }
        let unique = df
            .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)
            .map_err(|e| DataError::ProfilingFailed(format!("duplicate detection: {e}")))?;
        Ok(df.height() - unique.height())
    }
}
