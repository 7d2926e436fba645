//! Dataset analysis for automated model comparison.
//!
//! This crate holds everything that looks at the raw table before any model
//! is fitted:
//!
//! - **Profiling**: column typing, missing values, summary statistics and
//!   categorical distributions
//! - **Quality scoring**: a 0-100 score with issues and recommendations
//! - **Target candidates**: columns ranked by suitability as a target
//! - **Problem-type classification**: classification vs regression
//! - **Preprocessing**: label encoding and mean imputation into a numeric
//!   feature matrix
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use modelpick_data::{DataProfiler, FeaturePreprocessor, classify};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//!
//! let profile = DataProfiler::profile(&df);
//! println!("Quality score: {}", profile.quality_score);
//!
//! let problem_type = classify(&df, "price")?;
//! let prepared = FeaturePreprocessor::preprocess(&df, "price", problem_type)?;
//! println!("{} feature columns", prepared.features.n_cols());
//! ```

pub mod error;
pub mod preprocess;
pub mod problem_type;
pub mod profiler;
pub mod quality;
pub mod types;
pub mod utils;

pub use error::{DataError, Result as DataResult, ResultExt};
pub use preprocess::{FeatureMatrix, FeaturePreprocessor, PreparedData, TargetValues};
pub use problem_type::{REGRESSION_UNIQUE_RATIO, classify, classify_series};
pub use profiler::DataProfiler;
pub use quality::QualityAnalyzer;
pub use types::{
    CategoricalSummary, ColumnKind, DatasetProfile, NumericSummary, ProblemType, QualityReport,
    TargetCandidate,
};

static_assertions::assert_impl_all!(DatasetProfile: Send, Sync);
static_assertions::assert_impl_all!(PreparedData: Send, Sync);
