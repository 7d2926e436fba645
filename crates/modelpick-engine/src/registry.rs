//! The closed set of models the engine can train.
//!
//! Each [`ModelKind`] is one adapter family. A [`ModelSpec`] pairs a kind with
//! the problem type it serves and whether it takes the shared random seed.
//! Lookup order is registry order, which is also the tie-break order when
//! ranking.

use modelpick_data::ProblemType;
use serde::Serialize;

/// Adapter family behind a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    LogisticRegression,
    LinearRegression,
    Svm,
    NaiveBayes,
    DecisionTree,
    Xgboost,
    Lightgbm,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::LinearRegression => "linear_regression",
            ModelKind::Svm => "svm",
            ModelKind::NaiveBayes => "naive_bayes",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::Xgboost => "xgboost",
            ModelKind::Lightgbm => "lightgbm",
        }
    }

    /// Tree ensembles.
    pub fn is_ensemble(&self) -> bool {
        matches!(
            self,
            ModelKind::RandomForest | ModelKind::Xgboost | ModelKind::Lightgbm
        )
    }

    /// Linear models.
    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            ModelKind::LogisticRegression | ModelKind::LinearRegression
        )
    }
}

/// One registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub name: &'static str,
    pub problem_type: ProblemType,
    /// Whether the adapter consumes the shared seed. Deterministic solvers
    /// are built without one.
    pub accepts_seed: bool,
}

impl ModelSpec {
    const fn new(
        kind: ModelKind,
        name: &'static str,
        problem_type: ProblemType,
        accepts_seed: bool,
    ) -> Self {
        Self {
            kind,
            name,
            problem_type,
            accepts_seed,
        }
    }
}

use ModelKind as K;
use ProblemType::{Classification as C, Regression as R};

/// Classification models in registry order.
pub static CLASSIFICATION_MODELS: [ModelSpec; 7] = [
    ModelSpec::new(K::RandomForest, "random_forest", C, true),
    ModelSpec::new(K::LogisticRegression, "logistic_regression", C, false),
    ModelSpec::new(K::Svm, "svm", C, false),
    ModelSpec::new(K::NaiveBayes, "naive_bayes", C, false),
    ModelSpec::new(K::DecisionTree, "decision_tree", C, true),
    ModelSpec::new(K::Xgboost, "xgboost", C, true),
    ModelSpec::new(K::Lightgbm, "lightgbm", C, true),
];

/// Regression models in registry order.
pub static REGRESSION_MODELS: [ModelSpec; 6] = [
    ModelSpec::new(K::RandomForest, "random_forest", R, true),
    ModelSpec::new(K::LinearRegression, "linear_regression", R, false),
    ModelSpec::new(K::Svm, "svm", R, false),
    ModelSpec::new(K::DecisionTree, "decision_tree", R, true),
    ModelSpec::new(K::Xgboost, "xgboost", R, true),
    ModelSpec::new(K::Lightgbm, "lightgbm", R, true),
];

/// All models registered for `problem_type`, in registry order.
pub fn models_for(problem_type: ProblemType) -> &'static [ModelSpec] {
    match problem_type {
        ProblemType::Classification => &CLASSIFICATION_MODELS,
        ProblemType::Regression => &REGRESSION_MODELS,
    }
}

/// Find `name` in the registry for `problem_type`.
pub fn lookup(name: &str, problem_type: ProblemType) -> Option<&'static ModelSpec> {
    models_for(problem_type).iter().find(|spec| spec.name == name)
}

/// Registered names for `problem_type`, in registry order.
pub fn available_names(problem_type: ProblemType) -> Vec<String> {
    models_for(problem_type)
        .iter()
        .map(|spec| spec.name.to_string())
        .collect()
}

/// Family of a registered name, regardless of problem type.
pub fn kind_of(name: &str) -> Option<ModelKind> {
    CLASSIFICATION_MODELS
        .iter()
        .chain(REGRESSION_MODELS.iter())
        .find(|spec| spec.name == name)
        .map(|spec| spec.kind)
}
