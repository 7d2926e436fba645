//! Integration tests for training, ranking and suggestions over CSV fixtures.

use modelpick_data::{DataError, DataProfiler, ProblemType};
use modelpick_engine::metrics::{R2_SCORE, TEST_ACCURACY, TEST_MSE};
use modelpick_engine::{
    Diagnostics, EngineError, ResultStatus, SuggestionEngine, SuggestionSource, TrainingConfig,
    available_names, model_report, rank, train_and_evaluate,
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

fn assert_metrics_finite_or_null(run: &modelpick_engine::TrainingRun) {
    for result in &run.results {
        for (key, value) in &result.metrics {
            if let Some(v) = value {
                assert!(v.is_finite(), "{}: {key} = {v}", result.model_name);
            }
        }
    }
}

// ============================================================================
// Regression
// ============================================================================

#[test]
fn test_linear_target_ranks_linear_regression_first() {
    let df = load_csv("housing.csv");
    let models = ["decision_tree", "linear_regression", "random_forest"];
    let run = train_and_evaluate(&df, "price", &models, &TrainingConfig::default()).unwrap();

    assert_eq!(run.problem_type, ProblemType::Regression);
    assert_eq!(run.results.len(), 3);
    assert_eq!(run.train_shape.rows, 32);
    assert_eq!(run.test_shape.rows, 8);
    assert_eq!(run.train_shape.columns, 3);
    assert!(!run.test_size_adjusted);
    assert_metrics_finite_or_null(&run);

    let linear = run.result("linear_regression").unwrap();
    assert!(linear.is_success());
    assert!(linear.metric(R2_SCORE).unwrap() > 0.999);
    assert!(linear.metric(TEST_MSE).unwrap() < 1e-6);
    match &linear.diagnostics {
        Some(Diagnostics::Regression {
            residuals,
            target_stats,
            ..
        }) => {
            assert!(residuals.std.unwrap() < 1e-3);
            assert!(target_stats.std.unwrap() > 0.0);
            assert!(target_stats.min <= target_stats.max);
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }

    for name in ["decision_tree", "random_forest"] {
        let importance = &run.result(name).unwrap().feature_importance;
        assert_eq!(importance.len(), run.train_shape.columns, "{name}");
        let total: f64 = importance.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "{name}: {importance:?}");
    }

    let report = rank(&run.results, run.problem_type);
    assert_eq!(report.primary_metric, R2_SCORE);
    assert_eq!(report.best_model.as_deref(), Some("linear_regression"));
    assert_eq!(report.ranking[0].rank, 1);
    let excellent = format!(
        "linear_regression shows excellent fit (R² = {:.3})",
        linear.metric(R2_SCORE).unwrap()
    );
    assert!(report.insights.contains(&excellent));
}

#[test]
fn test_same_seed_reproduces_run() {
    let df = load_csv("housing.csv");
    let models = ["linear_regression", "decision_tree"];
    let config = TrainingConfig::builder().random_state(7).build().unwrap();

    let first = train_and_evaluate(&df, "price", &models, &config).unwrap();
    let second = train_and_evaluate(&df, "price", &models, &config).unwrap();

    for name in models {
        let (a, b) = (first.result(name).unwrap(), second.result(name).unwrap());
        assert_eq!(a.metrics, b.metrics, "{name}");
        assert_eq!(a.feature_importance, b.feature_importance, "{name}");
    }
    let first_order: Vec<_> = rank(&first.results, first.problem_type)
        .ranking
        .into_iter()
        .map(|r| r.model_name)
        .collect();
    let second_order: Vec<_> = rank(&second.results, second.problem_type)
        .ranking
        .into_iter()
        .map(|r| r.model_name)
        .collect();
    assert_eq!(first_order, second_order);
}

#[test]
fn test_negative_seed_is_accepted() {
    let df = load_csv("housing.csv");
    let config: TrainingConfig = serde_json::from_str(r#"{"random_state": -3}"#).unwrap();
    let run = train_and_evaluate(&df, "price", &["decision_tree"], &config).unwrap();
    assert!(run.result("decision_tree").unwrap().is_success());
    assert_eq!(run.test_shape.rows, 8);
}

#[test]
fn test_unknown_model_lists_regression_registry() {
    let df = load_csv("housing.csv");
    let err = train_and_evaluate(
        &df,
        "price",
        &["linear_regression", "catboost"],
        &TrainingConfig::default(),
    )
    .unwrap_err();

    match err {
        EngineError::UnknownModels {
            invalid,
            available,
            problem_type,
        } => {
            assert_eq!(invalid, vec!["catboost".to_string()]);
            assert_eq!(available, available_names(ProblemType::Regression));
            assert_eq!(problem_type, ProblemType::Regression);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_classification_only_model_rejected_for_regression() {
    let df = load_csv("housing.csv");
    let err = train_and_evaluate(&df, "price", &["naive_bayes"], &TrainingConfig::default())
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_MODELS");
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_multiclass_string_target() {
    let df = load_csv("flowers.csv");
    let models = ["random_forest", "decision_tree", "logistic_regression", "naive_bayes"];
    let run = train_and_evaluate(&df, "species", &models, &TrainingConfig::default()).unwrap();

    assert_eq!(run.problem_type, ProblemType::Classification);
    assert_eq!(run.results.len(), 4);
    assert_eq!(run.test_shape.rows, 9);
    assert_metrics_finite_or_null(&run);

    let tree = run.result("decision_tree").unwrap();
    assert!(tree.is_success());
    assert!(tree.metric(TEST_ACCURACY).unwrap() >= 0.8);
    match &tree.diagnostics {
        Some(Diagnostics::Classification {
            labels,
            confusion_matrix,
            ..
        }) => {
            assert_eq!(labels.len(), 3);
            let total: usize = confusion_matrix.iter().flatten().sum();
            assert_eq!(total, 9);
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }

    let report = rank(&run.results, run.problem_type);
    assert_eq!(report.primary_metric, TEST_ACCURACY);
    assert!(report.best_model.is_some());

    let logistic = run.result("logistic_regression").unwrap();
    match &logistic.diagnostics {
        Some(Diagnostics::Classification {
            auc_score,
            classification_report,
            ..
        }) => {
            let auc = auc_score.expect("logistic regression has class scores");
            assert!((0.0..=1.0).contains(&auc));
            assert!(classification_report.contains_key("macro avg"));
            assert_eq!(classification_report["weighted avg"].support, 9);
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }
    match &run.result("naive_bayes").unwrap().diagnostics {
        Some(Diagnostics::Classification { auc_score, .. }) => assert_eq!(*auc_score, None),
        other => panic!("unexpected diagnostics: {other:?}"),
    }

    let forest = run.result("random_forest").unwrap();
    assert_eq!(forest.feature_importance.len(), run.train_shape.columns);
    let forest_report =
        model_report(forest, run.problem_type).expect("successful model has a report");
    assert!(!forest_report.top_features.is_empty());
    assert!(forest_report.top_features.len() <= 3);
}

#[test]
fn test_failing_model_keeps_other_results() {
    // a single class: svm refuses it, the booster falls back to a constant
    let df = df![
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
        "label" => ["yes"; 12],
    ]
    .unwrap();
    let models = ["svm", "xgboost"];
    let run = train_and_evaluate(&df, "label", &models, &TrainingConfig::default()).unwrap();

    assert_eq!(run.results.len(), models.len());
    let svm = run.result("svm").unwrap();
    assert_eq!(svm.status, ResultStatus::Error);
    assert!(svm.error_message.is_some());
    assert!(svm.metrics.is_empty());
    assert!(model_report(svm, run.problem_type).is_none());

    let booster = run.result("xgboost").unwrap();
    assert_eq!(booster.status, ResultStatus::Success);
    assert!(booster.error_message.is_none());
    assert!(!booster.metrics.is_empty());
    assert_eq!(booster.metric(TEST_ACCURACY), Some(1.0));
    assert_metrics_finite_or_null(&run);

    let report = rank(&run.results, run.problem_type);
    let ranked: Vec<&str> = report
        .ranking
        .iter()
        .map(|r| r.model_name.as_str())
        .collect();
    assert_eq!(ranked, vec!["xgboost"]);
    assert_eq!(report.best_model.as_deref(), Some("xgboost"));
}

// ============================================================================
// Problem Type Inference
// ============================================================================

#[test]
fn test_problem_type_inference_through_pipeline() {
    let numeric = df![
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "y" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 9.0],
    ]
    .unwrap();
    let run =
        train_and_evaluate(&numeric, "y", &["linear_regression"], &TrainingConfig::default())
            .unwrap();
    assert_eq!(run.problem_type, ProblemType::Regression);

    let labels = df![
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        "y" => ["a", "b", "c", "a", "b", "c", "a", "b", "c"],
    ]
    .unwrap();
    let config = TrainingConfig::builder().test_size(0.1).build().unwrap();
    let run = train_and_evaluate(&labels, "y", &["decision_tree"], &config).unwrap();
    assert_eq!(run.problem_type, ProblemType::Classification);
    assert!(run.test_size_adjusted);
    assert_eq!(run.test_shape.rows, 1);
    assert_eq!(run.train_shape.rows, 8);
}

// ============================================================================
// Suggestions
// ============================================================================

#[test]
fn test_suggest_without_advisory() {
    let df = load_csv("flowers.csv");
    let profile = DataProfiler::profile(&df);
    let payload = SuggestionEngine::new()
        .suggest(&df, &profile, "species", None)
        .unwrap();

    assert_eq!(payload.problem_type, ProblemType::Classification);
    assert_eq!(payload.source, SuggestionSource::Performance);
    assert!(payload.advisory.is_none());
    assert_eq!(payload.recommended_models.len(), 3);
    assert_eq!(payload.recommended_models, payload.comparison.top(3));
    assert_eq!(payload.reasoning, payload.performance_explanation);
    assert_eq!(payload.data_summary.shape, [45, 4]);
    assert_eq!(payload.data_summary.target_unique_values, 3);

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["source"], "performance");
    assert_eq!(json["problem_type"], "classification");
}

#[test]
fn test_suggest_missing_target_is_request_error() {
    let df = load_csv("flowers.csv");
    let profile = DataProfiler::profile(&df);
    let err = SuggestionEngine::new()
        .suggest(&df, &profile, "nope", None)
        .unwrap_err();
    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    match &err {
        EngineError::Data(DataError::ColumnNotFound { column, available }) => {
            assert_eq!(column, "nope");
            assert_eq!(available.len(), 4);
            assert!(available.contains(&"species".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["available"].as_array().map(Vec::len), Some(4));
}
