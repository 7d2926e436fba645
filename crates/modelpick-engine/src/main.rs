//! CLI entry point for model comparison and recommendations.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use modelpick_data::{DataProfiler, DatasetProfile, ProblemType};
use modelpick_engine::{
    ComparisonReport, ModelReport, SuggestionEngine, SuggestionPayload, TrainingConfig,
    TrainingRun, model_report, rank, train_and_evaluate,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// CLI-compatible problem type enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProblemType {
    /// Discrete labels
    Classification,
    /// Continuous target
    Regression,
}

impl From<CliProblemType> for ProblemType {
    fn from(cli: CliProblemType) -> Self {
        match cli {
            CliProblemType::Classification => ProblemType::Classification,
            CliProblemType::Regression => ProblemType::Regression,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Automated model comparison for tabular data",
    long_about = "Profile a CSV dataset, compare models on it and recommend the best ones.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENAI_API_KEY    API key for the optional LLM advisory (suggest only)\n\n\
                  EXAMPLES:\n  \
                  # Profile a dataset\n  \
                  modelpick profile data.csv\n\n  \
                  # Compare two models\n  \
                  modelpick train data.csv --target price --models random_forest,linear_regression\n\n  \
                  # Recommend models as JSON\n  \
                  modelpick --json suggest data.csv --target species"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all progress logs; only the final result is written.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profile a dataset: column types, missing values, quality, target candidates
    Profile {
        /// Path to the CSV file
        input: String,
    },

    /// Train the given models on one split and compare them
    Train {
        /// Path to the CSV file
        input: String,

        /// Target column to predict
        #[arg(short, long)]
        target: String,

        /// Comma-separated model names
        #[arg(short, long, value_delimiter = ',', required = true)]
        models: Vec<String>,

        /// Fraction of rows held out for testing (0.0 - 1.0)
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Seed for the split and seeded models; negative values are accepted
        #[arg(long, default_value = "42", allow_negative_numbers = true)]
        random_state: i64,

        /// Mark models whose fit runs longer than this as failed
        #[arg(long)]
        max_fit_seconds: Option<f64>,
    },

    /// Recommend the best models for predicting a target
    Suggest {
        /// Path to the CSV file
        input: String,

        /// Target column to predict
        #[arg(short, long)]
        target: String,

        /// Override the inferred problem type
        #[arg(long, value_enum)]
        problem_type: Option<CliProblemType>,
    },
}

/// Full output of the `train` command.
#[derive(Serialize)]
struct TrainOutput {
    run: TrainingRun,
    comparison: ComparisonReport,
    reports: Vec<ModelReport>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries JSON.
fn init_logging(level: &str, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    match &args.command {
        Command::Profile { input } => {
            let data = load_csv(input)?;
            let profile = DataProfiler::profile(&data);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                print_profile(input, &profile);
            }
        }
        Command::Train {
            input,
            target,
            models,
            test_size,
            random_state,
            max_fit_seconds,
        } => {
            let data = load_csv(input)?;
            let mut builder = TrainingConfig::builder()
                .test_size(*test_size)
                .random_state(*random_state);
            if let Some(seconds) = max_fit_seconds {
                builder = builder.max_fit_seconds(*seconds);
            }
            let config = builder.build()?;

            let run = train_and_evaluate(&data, target, models.as_slice(), &config)?;
            let comparison = rank(&run.results, run.problem_type);
            let reports = run
                .results
                .iter()
                .filter_map(|result| model_report(result, run.problem_type))
                .collect();
            let output = TrainOutput {
                run,
                comparison,
                reports,
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_training(&output);
            }
        }
        Command::Suggest {
            input,
            target,
            problem_type,
        } => {
            let data = load_csv(input)?;
            let profile = DataProfiler::profile(&data);
            let engine = build_engine();
            let payload =
                engine.suggest(&data, &profile, target, problem_type.map(ProblemType::from))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_suggestion(&payload);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "ai")]
fn build_engine() -> SuggestionEngine {
    SuggestionEngine::from_env()
}

#[cfg(not(feature = "ai"))]
fn build_engine() -> SuggestionEngine {
    SuggestionEngine::new()
}

fn load_csv(path: &str) -> Result<DataFrame> {
    if !Path::new(path).exists() {
        return Err(anyhow!("Input file not found: {}", path));
    }

    info!("Loading dataset from: {}", path);
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()?;
    info!("Dataset loaded successfully: {:?}", df.shape());
    Ok(df)
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{title}");
    println!("{}\n", "=".repeat(80));
}

fn print_section(title: &str) {
    println!("{title}");
    println!("{}", "-".repeat(40));
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}"))
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn print_profile(input: &str, profile: &DatasetProfile) {
    print_header("DATASET PROFILE");

    print_section("OVERVIEW");
    println!("  File: {input}");
    println!("  Rows: {}", profile.row_count);
    println!("  Columns: {}", profile.column_count);
    println!("  Missing values: {}", profile.total_missing);
    println!("  Duplicate rows: {}", profile.duplicate_rows);
    if let Some(error) = &profile.error {
        println!("  Analysis failed: {error}");
        return;
    }
    println!();

    print_section("COLUMNS");
    println!("{:<24} {:<12} {:<10}", "Column", "Type", "Missing %");
    println!("{}", "-".repeat(48));
    for (name, kind) in &profile.column_types {
        let missing = profile
            .missing_percent_by_column
            .get(name)
            .copied()
            .unwrap_or(0.0);
        println!("{:<24} {:<12} {:<10.1}", truncate_str(name, 23), kind, missing);
    }
    println!();

    print_section("DATA QUALITY");
    println!("  Score: {:.1}/100", profile.quality_score);
    for issue in &profile.quality_issues {
        println!("  - {issue}");
    }
    for recommendation in &profile.recommendations {
        println!("  > {recommendation}");
    }
    println!();

    print_section("TARGET CANDIDATES");
    if profile.target_candidates.is_empty() {
        println!("  No suitable target columns found");
    }
    for candidate in &profile.target_candidates {
        println!(
            "  {} ({}): {}",
            candidate.column,
            candidate.suitability_score,
            candidate.reasons.join(", ")
        );
    }
}

fn print_ranking(comparison: &ComparisonReport) {
    print_section("RANKING");
    println!(
        "{:<6} {:<22} {:<12} {:<10}",
        "Rank", "Model", comparison.primary_metric, "Time (s)"
    );
    println!("{}", "-".repeat(52));
    for entry in &comparison.ranking {
        println!(
            "{:<6} {:<22} {:<12} {:<10.3}",
            entry.rank,
            entry.model_name,
            format_score(entry.primary_score),
            entry.training_time
        );
    }
    println!();

    if !comparison.insights.is_empty() {
        print_section("INSIGHTS");
        for insight in &comparison.insights {
            println!("  - {insight}");
        }
        println!();
    }
}

fn print_training(output: &TrainOutput) {
    let run = &output.run;
    print_header("MODEL COMPARISON");

    print_section("SETUP");
    println!("  Problem type: {}", run.problem_type);
    println!(
        "  Train/test rows: {}/{} (test size {:.2})",
        run.train_shape.rows, run.test_shape.rows, run.effective_test_size
    );
    for note in &run.notes {
        println!("  Note: {note}");
    }
    println!();

    print_ranking(&output.comparison);

    let failed: Vec<_> = run.results.iter().filter(|r| !r.is_success()).collect();
    if !failed.is_empty() {
        print_section("FAILED MODELS");
        for result in failed {
            println!(
                "  - {}: {}",
                result.model_name,
                result.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        println!();
    }

    for report in &output.reports {
        print_section(&format!("REPORT: {}", report.model_name));
        for strength in &report.strengths {
            println!("  + {strength}");
        }
        for weakness in &report.weaknesses {
            println!("  - {weakness}");
        }
        if !report.top_features.is_empty() {
            let features: Vec<String> = report
                .top_features
                .iter()
                .map(|f| format!("{} ({:.3})", f.feature, f.importance))
                .collect();
            println!("  Top features: {}", features.join(", "));
        }
        for recommendation in &report.recommendations {
            println!("  > {recommendation}");
        }
        println!();
    }
}

fn print_suggestion(payload: &SuggestionPayload) {
    print_header("MODEL SUGGESTIONS");

    print_section("DATASET");
    let summary = &payload.data_summary;
    println!("  Shape: [{}, {}]", summary.shape[0], summary.shape[1]);
    println!("  Target: {} ({})", summary.target_column, summary.target_type);
    println!("  Problem type: {}", payload.problem_type);
    println!();

    print_ranking(&payload.comparison);

    print_section("RECOMMENDED");
    for (i, model) in payload.recommended_models.iter().enumerate() {
        println!("  {}. {model}", i + 1);
    }
    println!();
    println!("  Source: {}", payload.source);
    println!("  {}", payload.reasoning);
}
