//! Data quality scoring.
//!
//! Deducts from a perfect score of 100 for missingness, duplicate rows,
//! near-constant numeric columns, and high-cardinality categoricals.

mod analyzer;

pub use analyzer::{QualityAnalyzer, QualityInputs, recommendations_for};
