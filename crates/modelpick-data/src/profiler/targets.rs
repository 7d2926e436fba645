//! Target-column suitability scoring.

use crate::error::Result;
use crate::types::{ColumnKind, TargetCandidate};
use crate::utils::{series_kind, unique_count, value_counts};
use polars::prelude::*;

const MAX_CANDIDATES: usize = 5;
const BALANCE_CHECK_MAX_UNIQUE: usize = 10;
const REGRESSION_UNIQUE_RATIO: f64 = 0.05;

/// Score every column and return the best five, highest first.
///
/// The sort is stable so equal scores keep column order.
pub(crate) fn rank_target_candidates(df: &DataFrame) -> Result<Vec<TargetCandidate>> {
    let mut candidates = df
        .get_columns()
        .iter()
        .map(|c| score_column(c.as_materialized_series(), df.height()))
        .collect::<Result<Vec<_>>>()?;

    candidates.sort_by(|a, b| b.suitability_score.cmp(&a.suitability_score));
    candidates.truncate(MAX_CANDIDATES);
    Ok(candidates)
}

fn score_column(series: &Series, rows: usize) -> Result<TargetCandidate> {
    let unique = unique_count(series)?;
    let missing = series.null_count();
    let mut score = 0;
    let mut reasons = Vec::new();
    let mut add = |delta: i32, reason: &str| {
        score += delta;
        reasons.push(reason.to_string());
    };

    let ratio = |count: usize| if rows > 0 { count as f64 / rows as f64 } else { 0.0 };

    match series_kind(series) {
        ColumnKind::Categorical => {
            if (2..=20).contains(&unique) {
                add(30, "Good categorical target (2-20 categories)");
            } else if unique > 20 {
                add(10, "High cardinality categorical");
            }
        }
        ColumnKind::Numeric => {
            if ratio(unique) > REGRESSION_UNIQUE_RATIO {
                add(25, "Numeric with good variance");
            } else {
                add(15, "Numeric but low variance");
            }
        }
        ColumnKind::Datetime => {}
    }

    if ratio(missing) > 0.1 {
        add(-20, "High missing values");
    }

    if unique <= BALANCE_CHECK_MAX_UNIQUE {
        let balance = class_balance(series)?;
        if balance > 0.3 {
            add(15, "Well-balanced classes");
        } else if balance > 0.1 {
            add(5, "Moderately balanced classes");
        } else {
            add(-10, "Imbalanced classes");
        }
    }

    Ok(TargetCandidate {
        column: series.name().to_string(),
        dtype: series.dtype().to_string(),
        unique_values: unique,
        missing_values: missing,
        suitability_score: score,
        reasons,
    })
}

/// Smallest class count over the largest, 0 for an empty column.
fn class_balance(series: &Series) -> Result<f64> {
    let counts = value_counts(series)?;
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let min = counts.iter().map(|(_, c)| *c).min().unwrap_or(0);
    if max == 0 {
        return Ok(0.0);
    }
    Ok(min as f64 / max as f64)
}
