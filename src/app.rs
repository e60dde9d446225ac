//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - runs training / preprocessing / estimation
//! - prints reports and writes optional exports

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DataArgs, EstimateArgs, PreprocessArgs, TrainArgs};
use crate::domain::{ArtifactPaths, CostBreakpoints, TrainConfig};
use crate::error::AppError;
use crate::estimate::{EstimateRequest, EstimateResponse, Estimator};
use crate::preprocess::PreprocessOptions;
use crate::snapshot::SnapshotStore;
use crate::tables::LookupTables;

pub mod pipeline;

/// How many ingest row errors are printed before summarizing.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Entry point for the `repest` binary.
pub fn run() -> Result<(), AppError> {
    // Environment defaults (REPEST_*) may come from a local .env file.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Estimate(args) => handle_estimate(args),
        Command::Preprocess(args) => handle_preprocess(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed (e.g. when embedded); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(&args);
    let store = SnapshotStore::new();
    let run = pipeline::run_training(&config, &store)?;

    print!(
        "{}",
        crate::report::format_row_errors(&run.row_errors, MAX_ROW_ERRORS_SHOWN)
    );
    println!("{}", crate::report::format_training_summary(&run.summary));
    println!(
        "Saved model to '{}' and encoders to '{}'.",
        config.artifacts.model.display(),
        config.artifacts.encoders.display()
    );

    if let Some(path) = &config.report_json {
        crate::io::write_report_json(path, &run.summary)?;
    }

    Ok(())
}

fn handle_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let request = match &args.request {
        Some(path) => read_request_json(path)?,
        None => EstimateRequest {
            brand: args.brand.clone(),
            model_type: args.model_type.clone(),
            damage: args.damage.clone(),
        },
    };

    let paths = ArtifactPaths {
        model: args.artifacts.model.clone(),
        encoders: args.artifacts.encoders.clone(),
    };
    let store = Arc::new(SnapshotStore::new());
    // Client input errors are reported before the artifacts are touched.
    let result = request
        .check_required()
        .and_then(|_| store.load_from(&paths))
        .and_then(|_| Estimator::new(Arc::clone(&store)).estimate(&request));

    let response = EstimateResponse::from_result(&result);
    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| AppError::new(4, format!("Failed to serialize estimate response: {e}")))?;
    println!("{json}");

    result.map(|_| ()).map_err(AppError::from)
}

fn handle_preprocess(args: PreprocessArgs) -> Result<(), AppError> {
    let tables = LookupTables::load(args.data.tables.as_deref())?;
    let opts = preprocess_options_from_args(&args.data)?;
    let run = pipeline::run_preprocess(&args.data.data, &tables, &opts)?;

    print!(
        "{}",
        crate::report::format_row_errors(&run.row_errors, MAX_ROW_ERRORS_SHOWN)
    );
    println!("{}", crate::report::format_stage_report(&run.frame.report));
    println!(
        "{}",
        crate::report::format_record_preview(&run.frame.records, args.preview)
    );

    if let Some(path) = &args.export {
        crate::io::write_records_csv(path, &run.frame.records)?;
        println!("Wrote {} records to '{}'.", run.frame.records.len(), path.display());
    }

    Ok(())
}

fn read_request_json(path: &Path) -> Result<EstimateRequest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open request JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid request JSON: {e}")))
}

fn preprocess_options_from_args(args: &DataArgs) -> Result<PreprocessOptions, AppError> {
    let breakpoints = CostBreakpoints {
        cheap_max: args.cheap_max,
        medium_max: args.medium_max,
    };
    breakpoints.validate()?;
    if args.min_support == 0 {
        return Err(AppError::new(2, "Minimum category support must be >= 1."));
    }
    Ok(PreprocessOptions {
        min_support: args.min_support,
        breakpoints,
    })
}

pub fn train_config_from_args(args: &TrainArgs) -> TrainConfig {
    TrainConfig {
        data_path: args.data.data.clone(),
        tables_path: args.data.tables.clone(),
        artifacts: ArtifactPaths {
            model: args.artifacts.model.clone(),
            encoders: args.artifacts.encoders.clone(),
        },
        min_support: args.data.min_support,
        breakpoints: CostBreakpoints {
            cheap_max: args.data.cheap_max,
            medium_max: args.data.medium_max,
        },
        test_size: args.test_size,
        seed: args.seed,
        max_depth: args.max_depth,
        report_json: args.report_json.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn train_args(argv: &[&str]) -> TrainArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Train(args) => args,
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn train_flags_map_onto_config() {
        let args = train_args(&[
            "repest",
            "train",
            "--data",
            "shop.csv",
            "--cheap-max",
            "200000",
            "--medium-max",
            "600000",
            "--max-depth",
            "6",
            "--report-json",
            "report.json",
        ]);
        let config = train_config_from_args(&args);

        assert_eq!(config.data_path, Path::new("shop.csv"));
        assert_eq!(config.breakpoints.cheap_max, 200_000.0);
        assert_eq!(config.breakpoints.medium_max, 600_000.0);
        assert_eq!(config.max_depth, Some(6));
        assert_eq!(config.report_json.as_deref(), Some(Path::new("report.json")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_breakpoints_are_rejected_before_any_work() {
        let args = train_args(&[
            "repest",
            "train",
            "--cheap-max",
            "600000",
            "--medium-max",
            "200000",
        ]);
        let err = train_config_from_args(&args).validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn preprocess_options_reject_zero_support() {
        let cli = Cli::try_parse_from(["repest", "preprocess", "--min-support", "0"]).unwrap();
        let Command::Preprocess(args) = cli.command else {
            panic!("expected preprocess");
        };
        assert_eq!(preprocess_options_from_args(&args.data).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn request_json_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("req.json");
        std::fs::write(&path, r#"{"brand":"Vivo","type":"Y21"}"#).unwrap();

        let request = read_request_json(&path).unwrap();
        assert_eq!(request.brand.as_deref(), Some("Vivo"));
        assert_eq!(request.damage, None);
    }

    #[test]
    fn missing_fields_are_reported_before_loading_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.json");
        let encoders = dir.path().join("encoders.json");
        let argv: Vec<std::ffi::OsString> = vec![
            "repest".into(),
            "estimate".into(),
            "--model".into(),
            model.into_os_string(),
            "--encoders".into(),
            encoders.into_os_string(),
            "--type".into(),
            "Y21".into(),
            "--damage".into(),
            "ganti lcd".into(),
        ];
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };

        let err = handle_estimate(args).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert_eq!(err.to_string(), "missing required field(s): brand");
    }
}
