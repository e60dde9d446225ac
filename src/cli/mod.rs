//! Command-line parsing for the repair estimator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code. Every path and tunable also reads a `REPEST_*` environment
//! variable (a `.env` file is loaded before parsing).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "repest", version, about = "Device repair cost & turnaround estimator")]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Preprocess the dataset, fit the cost model, evaluate it and save the artifacts.
    Train(TrainArgs),
    /// Estimate the cost category and turnaround of one repair.
    Estimate(EstimateArgs),
    /// Run the preprocessing stages only and optionally export the cleaned records.
    Preprocess(PreprocessArgs),
}

/// Dataset and preprocessing options shared by `train` and `preprocess`.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Historical repair records (CSV).
    #[arg(long, env = "REPEST_DATA", default_value = "data/dataset.csv")]
    pub data: PathBuf,

    /// Lookup tables JSON replacing the built-in tables.
    #[arg(long, env = "REPEST_TABLES")]
    pub tables: Option<PathBuf>,

    /// Damage categories with fewer rows are dropped from training.
    #[arg(long, env = "REPEST_MIN_SUPPORT", default_value_t = crate::preprocess::DEFAULT_MIN_SUPPORT)]
    pub min_support: usize,

    /// Upper bound (inclusive) of the Cheap cost bucket.
    #[arg(long, env = "REPEST_COST_CHEAP_MAX", default_value_t = 250_000.0)]
    pub cheap_max: f64,

    /// Upper bound (inclusive) of the Medium cost bucket.
    #[arg(long, env = "REPEST_COST_MEDIUM_MAX", default_value_t = 500_000.0)]
    pub medium_max: f64,
}

/// Where the model and encoder artifacts are stored.
#[derive(Debug, Args, Clone)]
pub struct ArtifactArgs {
    /// Model artifact (JSON).
    #[arg(long, env = "REPEST_MODEL", default_value = "model/model.json")]
    pub model: PathBuf,

    /// Encoder set artifact (JSON).
    #[arg(long, env = "REPEST_ENCODERS", default_value = "model/encoders.json")]
    pub encoders: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    /// Fraction of rows held out for evaluation.
    #[arg(long, env = "REPEST_TEST_SIZE", default_value_t = 0.3)]
    pub test_size: f64,

    /// Seed for the train/test shuffle.
    #[arg(long, env = "REPEST_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Maximum tree depth (unlimited when omitted).
    #[arg(long, env = "REPEST_MAX_DEPTH")]
    pub max_depth: Option<usize>,

    /// Also write the training summary and metrics as JSON.
    #[arg(long = "report-json", value_name = "JSON")]
    pub report_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EstimateArgs {
    // Lookup tables come from the model artifact; no `--tables` here.
    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    /// Device brand, e.g. "Vivo".
    #[arg(long)]
    pub brand: Option<String>,

    /// Device model/type text, e.g. "Y21".
    #[arg(long = "type", value_name = "TYPE")]
    pub model_type: Option<String>,

    /// Damage description, e.g. "ganti lcd".
    #[arg(long)]
    pub damage: Option<String>,

    /// Read the request from a JSON file (`{"brand", "type", "damage"}`) instead of flags.
    #[arg(long, value_name = "JSON", conflicts_with_all = ["brand", "model_type", "damage"])]
    pub request: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PreprocessArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Write the canonical records to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Number of cleaned rows to preview.
    #[arg(long, default_value_t = 10)]
    pub preview: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn estimate_flags_parse() {
        let cli = Cli::try_parse_from([
            "repest", "estimate", "--brand", "Vivo", "--type", "Y21", "--damage", "ganti lcd",
        ])
        .unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.brand.as_deref(), Some("Vivo"));
        assert_eq!(args.model_type.as_deref(), Some("Y21"));
        assert!(args.request.is_none());
    }

    #[test]
    fn request_file_conflicts_with_flags() {
        let parsed = Cli::try_parse_from([
            "repest", "estimate", "--request", "req.json", "--brand", "Vivo",
        ]);
        assert!(parsed.is_err());
    }
}
