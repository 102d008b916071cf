//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments into config structs
//! - runs the offline pipelines or the HTTP server
//! - prints reports

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use clap::Parser;

use crate::cli::{Cli, Command, PrepareArgs, ScoreArgs, ServeArgs, TrainArgs};
use crate::domain::{BoostParams, LoanApplication, PrepareConfig, ServeConfig, TrainConfig};
use crate::error::AppError;
use crate::scoring::Scorer;

pub mod pipeline;

/// Entry point for the `credit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; flags and the real environment still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Prepare(args) => handle_prepare(&args),
        Command::Train(args) => handle_train(&args),
        Command::Serve(args) => handle_serve(&args),
        Command::Score(args) => handle_score(&args),
    }
}

/// Log to stderr so reports on stdout stay clean. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // `try_init` so repeated calls (tests) don't panic.
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_prepare(args: &PrepareArgs) -> Result<(), AppError> {
    let config = prepare_config_from_args(args);
    let out = pipeline::run_prepare(&config)?;
    println!(
        "{}",
        crate::report::format_prepare_summary(&out.summary, &out.processed_path, &out.mappings_path)
    );
    Ok(())
}

fn handle_train(args: &TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(args);
    let out = pipeline::run_train(&config)?;
    println!("{}", crate::report::format_evaluation(&out.evaluation, &out.model_path));
    Ok(())
}

fn handle_serve(args: &ServeArgs) -> Result<(), AppError> {
    let config = serve_config_from_args(args);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::new(5, format!("Failed to start async runtime: {e}")))?;
    runtime.block_on(crate::server::serve(&config))
}

fn handle_score(args: &ScoreArgs) -> Result<(), AppError> {
    let scorer = Scorer::load(&args.model, &args.mappings)?;
    let loan = read_application_json(&args.input)?;
    let response = scorer.score(&loan)?;

    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| AppError::new(2, format!("Failed to serialize score: {e}")))?;
    println!("{json}");
    Ok(())
}

fn read_application_json(path: &Path) -> Result<LoanApplication, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open application '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid application '{}': {e}", path.display())))
}

pub fn prepare_config_from_args(args: &PrepareArgs) -> PrepareConfig {
    PrepareConfig {
        data_dir: args.data_dir.clone(),
        out_dir: args.out_dir.clone(),
        sector: args.sector.clone(),
        funded_ratio_threshold: args.funded_ratio,
        accept_share: args.accept_share,
        density_clip_quantile: args.density_quantile,
        seed: args.seed,
    }
}

pub fn train_config_from_args(args: &TrainArgs) -> TrainConfig {
    TrainConfig {
        processed_csv: args.processed.clone(),
        model_path: args.model.clone(),
        test_fraction: args.test_fraction,
        split_seed: args.split_seed,
        params: BoostParams {
            n_rounds: args.rounds,
            learning_rate: args.learning_rate,
            max_depth: args.max_depth,
            min_child_weight: args.min_child_weight,
            subsample: args.subsample,
            colsample_bytree: args.colsample_bytree,
            gamma: args.gamma,
            lambda: args.lambda,
            scale_pos_weight: args.scale_pos_weight.unwrap_or(1.0),
            seed: args.seed,
        },
        auto_scale_pos_weight: args.scale_pos_weight.is_none(),
    }
}

pub fn serve_config_from_args(args: &ServeArgs) -> ServeConfig {
    ServeConfig {
        model_path: args.model.clone(),
        mappings_path: args.mappings.clone(),
        host: args.host,
        port: args.port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_config_uses_auto_weight_unless_given() {
        let cli = Cli::parse_from(["credit", "train", "--model", "m.json"]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = train_config_from_args(&args);
        assert!(config.auto_scale_pos_weight);
        assert_eq!(config.params, BoostParams::default());

        let cli = Cli::parse_from(["credit", "train", "--model", "m.json", "--scale-pos-weight", "2.5"]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = train_config_from_args(&args);
        assert!(!config.auto_scale_pos_weight);
        assert_eq!(config.params.scale_pos_weight, 2.5);
    }

    #[test]
    fn prepare_config_maps_flags() {
        let cli = Cli::parse_from(["credit", "prepare", "--data-dir", "raw", "--accept-share", "0.5"]);
        let Command::Prepare(args) = cli.command else {
            panic!("expected prepare");
        };
        let config = prepare_config_from_args(&args);
        assert_eq!(config.data_dir, Path::new("raw"));
        assert_eq!(config.accept_share, 0.5);
        assert_eq!(config.sector, "Agriculture");
    }

    #[test]
    fn missing_application_file_is_input_error() {
        let err = read_application_json(Path::new("/nonexistent/loan.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
