//! Prompt construction and reply parsing shared by advisory providers.

use crate::registry::{available_names, lookup};
use anyhow::{Context, Result, anyhow};
use modelpick_data::ProblemType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outermost `{...}` block of a reply, across lines.
static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("Invalid regex: JSON block"));

/// Dataset facts sent to the advisory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// `[rows, columns]`.
    pub shape: [usize; 2],
    pub target_column: String,
    /// Storage type of the target column.
    pub target_type: String,
    pub target_unique_values: usize,
    pub missing_values: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
    pub problem_type: ProblemType,
}

/// Recommendations returned by a provider, restricted to registered models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub recommended_models: Vec<String>,
    pub reasoning: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reasoning {
    Text(String),
    Points(Vec<String>),
}

#[derive(Deserialize)]
struct RawAdvisory {
    recommended_models: Vec<String>,
    #[serde(default)]
    reasoning: Option<Reasoning>,
}

/// The recommendation prompt for `summary`.
pub fn build_prompt(summary: &DataSummary) -> String {
    format!(
        "Given the following dataset characteristics, suggest the best machine learning models:\n\n\
        Dataset Info:\n\
        - Shape: [{rows}, {cols}]\n\
        - Problem Type: {problem_type}\n\
        - Target Column Type: {target_type}\n\
        - Unique Target Values: {unique}\n\
        - Missing Values: {missing}\n\
        - Numeric Columns: {numeric}\n\
        - Categorical Columns: {categorical}\n\n\
        Please suggest the top 3-5 most suitable machine learning models and explain why.\n\
        Respond in JSON format with 'recommended_models' (list of model names) and 'reasoning' (explanation).\n\n\
        Available models for classification: {classification}\n\
        Available models for regression: {regression}\n",
        rows = summary.shape[0],
        cols = summary.shape[1],
        problem_type = summary.problem_type,
        target_type = summary.target_type,
        unique = summary.target_unique_values,
        missing = summary.missing_values,
        numeric = summary.numeric_columns,
        categorical = summary.categorical_columns,
        classification = available_names(ProblemType::Classification).join(", "),
        regression = available_names(ProblemType::Regression).join(", "),
    )
}

/// Parse a provider reply into an [`Advisory`].
///
/// The first `{...}` block is read as JSON, so code fences and surrounding
/// prose are tolerated. `reasoning` may be a string or a list of strings.
/// Names not registered for `problem_type` are dropped.
///
/// # Errors
///
/// Returns an error if there is no JSON object, it lacks
/// `recommended_models`, or no registered name survives filtering.
pub fn parse_advisory(reply: &str, problem_type: ProblemType) -> Result<Advisory> {
    let block = JSON_BLOCK
        .find(reply)
        .ok_or_else(|| anyhow!("No JSON object in advisory reply"))?;
    let raw: RawAdvisory =
        serde_json::from_str(block.as_str()).context("Malformed advisory JSON")?;

    let mut seen = HashSet::new();
    let recommended_models: Vec<String> = raw
        .recommended_models
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| lookup(name, problem_type).is_some())
        .filter(|name| seen.insert(name.clone()))
        .collect();
    if recommended_models.is_empty() {
        return Err(anyhow!(
            "Advisory reply names no registered {problem_type} model"
        ));
    }

    let reasoning = match raw.reasoning {
        Some(Reasoning::Text(text)) => text,
        Some(Reasoning::Points(points)) => points.join(" "),
        None => String::new(),
    };
    Ok(Advisory {
        recommended_models,
        reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> DataSummary {
        DataSummary {
            shape: [150, 5],
            target_column: "species".to_string(),
            target_type: "str".to_string(),
            target_unique_values: 3,
            missing_values: 0,
            numeric_columns: 4,
            categorical_columns: 1,
            problem_type: ProblemType::Classification,
        }
    }

    #[test]
    fn test_prompt_contains_summary() {
        let prompt = build_prompt(&summary());
        assert!(prompt.contains("- Shape: [150, 5]"));
        assert!(prompt.contains("- Problem Type: classification"));
        assert!(prompt.contains("- Unique Target Values: 3"));
        assert!(prompt.contains("'recommended_models'"));
        assert!(prompt.contains("naive_bayes"));
        assert!(prompt.contains("linear_regression"));
    }

    #[test]
    fn test_parse_plain_json() {
        let reply = r#"{"recommended_models": ["random_forest", "svm"], "reasoning": "Both fit."}"#;
        let advisory = parse_advisory(reply, ProblemType::Classification).unwrap();
        assert_eq!(advisory.recommended_models, vec!["random_forest", "svm"]);
        assert_eq!(advisory.reasoning, "Both fit.");
    }

    #[test]
    fn test_parse_fenced_reply_with_list_reasoning() {
        let reply = "Here you go:\n```json\n{\n  \"recommended_models\": [\"XGBoost \", \"lightgbm\"],\n  \"reasoning\": [\"Fast.\", \"Accurate.\"]\n}\n```";
        let advisory = parse_advisory(reply, ProblemType::Regression).unwrap();
        assert_eq!(advisory.recommended_models, vec!["xgboost", "lightgbm"]);
        assert_eq!(advisory.reasoning, "Fast. Accurate.");
    }

    #[test]
    fn test_unregistered_names_filtered() {
        let reply = r#"{"recommended_models": ["naive_bayes", "linear_regression", "linear_regression", "catboost"]}"#;
        let advisory = parse_advisory(reply, ProblemType::Regression).unwrap();
        assert_eq!(advisory.recommended_models, vec!["linear_regression"]);
        assert!(advisory.reasoning.is_empty());
    }

    #[test]
    fn test_unusable_replies() {
        assert!(parse_advisory("no json here", ProblemType::Classification).is_err());
        assert!(parse_advisory("{not json}", ProblemType::Classification).is_err());
        assert!(parse_advisory(r#"{"reasoning": "x"}"#, ProblemType::Classification).is_err());
        assert!(
            parse_advisory(r#"{"recommended_models": ["catboost"]}"#, ProblemType::Classification)
                .is_err()
        );
    }
}
