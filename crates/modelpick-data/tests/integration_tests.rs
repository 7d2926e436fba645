//! Integration tests for profiling and preprocessing over CSV fixtures.

use modelpick_data::{
    ColumnKind, DataError, DataProfiler, FeaturePreprocessor, ProblemType, TargetValues, classify,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

// ============================================================================
// Profiling
// ============================================================================

#[test]
fn test_profile_customers() {
    let df = load_csv("customers.csv");
    let profile = DataProfiler::profile(&df);

    assert!(profile.is_ok());
    assert_eq!(profile.row_count, 12);
    assert_eq!(profile.column_count, 6);
    assert_eq!(profile.total_missing, 3);
    assert_eq!(profile.missing_by_column["income"], 2);
    assert_eq!(profile.column_types["segment"], ColumnKind::Categorical);
    assert_eq!(profile.column_types["signup_score"], ColumnKind::Numeric);
    assert_eq!(
        profile.numeric_columns,
        vec![
            "age".to_string(),
            "income".to_string(),
            "signup_score".to_string()
        ]
    );

    // Only the identifier column is penalised.
    assert_eq!(profile.quality_score, 90.0);
    assert_eq!(
        profile.quality_issues,
        vec!["High cardinality column: customer_id".to_string()]
    );
    assert_eq!(
        profile.recommendations,
        vec!["Consider encoding or grouping high cardinality column 'customer_id'".to_string()]
    );

    let segment = &profile.categorical_summary["segment"];
    assert_eq!(segment.unique_count, 3);
    assert_eq!(segment.most_frequent.as_deref(), Some("retail"));
}

#[test]
fn test_target_candidates_customers() {
    let df = load_csv("customers.csv");
    let profile = DataProfiler::profile(&df);

    let names: Vec<&str> = profile
        .target_candidates
        .iter()
        .map(|c| c.column.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["segment", "churned", "customer_id", "age", "signup_score"]
    );
    assert_eq!(profile.target_candidates[0].suitability_score, 45);
    assert_eq!(profile.target_candidates[1].suitability_score, 45);
}

#[test]
fn test_profile_duplicates() {
    let df = load_csv("duplicates.csv");
    let profile = DataProfiler::profile(&df);

    assert_eq!(profile.duplicate_rows, 2);
    assert_eq!(profile.quality_score, 85.0);
    assert_eq!(profile.quality_issues[0], "High duplicate rows: 20.0%");
}

// ============================================================================
// Problem Type & Preprocessing
// ============================================================================

#[test]
fn test_classify_fixture_targets() {
    let df = load_csv("customers.csv");
    assert_eq!(
        classify(&df, "churned").unwrap(),
        ProblemType::Classification
    );
    assert_eq!(classify(&df, "income").unwrap(), ProblemType::Regression);
    match classify(&df, "nope") {
        Err(DataError::ColumnNotFound { column, available }) => {
            assert_eq!(column, "nope");
            assert_eq!(available.len(), df.width());
            assert!(available.contains(&"churned".to_string()));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_preprocess_customers() {
    let df = load_csv("customers.csv");
    let prepared =
        FeaturePreprocessor::preprocess(&df, "churned", ProblemType::Classification).unwrap();

    assert_eq!(prepared.features.n_rows(), 12);
    assert_eq!(prepared.features.n_cols(), 5);
    assert!(!prepared.features.columns.contains(&"churned".to_string()));
    assert_eq!(
        prepared.imputed_columns,
        vec!["age".to_string(), "income".to_string()]
    );
    assert_eq!(prepared.encodings["segment"].len(), 3);
    for row in &prepared.features.rows {
        assert!(row.iter().all(|v| v.is_finite()));
    }

    match &prepared.target {
        TargetValues::Classes { labels, names } => {
            assert_eq!(names, &vec!["no".to_string(), "yes".to_string()]);
            assert_eq!(labels[0], 0);
            assert_eq!(labels[1], 1);
        }
        other => panic!("expected class labels, got {other:?}"),
    }
}

#[test]
fn test_preprocess_does_not_mutate_input() {
    let df = load_csv("customers.csv");
    let before = df.clone();
    let _ = FeaturePreprocessor::preprocess(&df, "income", ProblemType::Regression).unwrap();
    assert!(df.equals_missing(&before));
}
