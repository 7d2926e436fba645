//! Per-column summary statistics.

use crate::error::Result;
use crate::types::{CategoricalSummary, NumericSummary};
use crate::utils::{mean, non_null_f64, quantile_sorted, sample_std, value_counts};
use polars::prelude::*;

const TOP_VALUE_COUNTS: usize = 10;

/// Count, mean, std, min, quartiles, and max of a numeric column.
pub(crate) fn numeric_summary(series: &Series) -> Result<NumericSummary> {
    let mut values = non_null_f64(series)?;
    values.sort_by(|a, b| a.total_cmp(b));

    Ok(NumericSummary {
        count: values.len(),
        mean: mean(&values),
        std: sample_std(&values),
        min: values.first().copied(),
        q25: quantile_sorted(&values, 0.25),
        median: quantile_sorted(&values, 0.5),
        q75: quantile_sorted(&values, 0.75),
        max: values.last().copied(),
    })
}

/// Unique count, mode, and top value counts of a categorical column.
pub(crate) fn categorical_summary(series: &Series) -> Result<CategoricalSummary> {
    let counts = value_counts(series)?;

    // Mode ties resolve to the smallest value.
    let most_frequent = counts.first().map(|(_, top)| *top).and_then(|top| {
        counts
            .iter()
            .filter(|(_, c)| *c == top)
            .map(|(v, _)| v)
            .min()
            .cloned()
    });

    Ok(CategoricalSummary {
        unique_count: counts.len(),
        most_frequent,
        value_counts: counts.into_iter().take(TOP_VALUE_COUNTS).collect(),
    })
}
