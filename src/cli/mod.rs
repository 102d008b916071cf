//! Command-line parsing for the `credit` binary.
//!
//! Argument parsing and command dispatch stay separate from the ETL, training
//! and serving code; `app` turns these structs into plain config values.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

pub const DEFAULT_MODEL_PATH: &str = "model/credit_gbdt.json";
pub const DEFAULT_MAPPINGS_PATH: &str = "data/label_mappings.json";
pub const DEFAULT_PROCESSED_PATH: &str = "data/processed_kiva.csv";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "credit", version, about = "Credit scoring for agricultural micro-loans")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides this.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the processed training CSV and label mappings from raw Kiva exports.
    Prepare(PrepareArgs),
    /// Train the boosted-tree classifier on the processed CSV and save the model.
    Train(TrainArgs),
    /// Serve `GET /` and `POST /predict` over HTTP.
    Serve(ServeArgs),
    /// Score a single loan application read from a JSON file.
    Score(ScoreArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct PrepareArgs {
    /// Directory holding the raw Kiva CSV exports.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Output directory for `processed_kiva.csv` and `label_mappings.json`.
    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,

    /// Loan sector to keep.
    #[arg(long, default_value = "Agriculture")]
    pub sector: String,

    /// Funded ratio at or above which a loan is labeled funded.
    #[arg(long, default_value_t = 0.9)]
    pub funded_ratio: f64,

    /// Share of funded rows after rebalancing.
    #[arg(long, default_value_t = 0.6)]
    pub accept_share: f64,

    /// Upper quantile at which theme loan density is clipped.
    #[arg(long, default_value_t = 0.95)]
    pub density_quantile: f64,

    /// Random seed for rebalancing.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Parser, Clone)]
pub struct TrainArgs {
    /// Processed CSV produced by `credit prepare`.
    #[arg(long, default_value = DEFAULT_PROCESSED_PATH)]
    pub processed: PathBuf,

    /// Where to write the model file.
    #[arg(long, env = "CREDIT_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Fraction of rows held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed for the stratified train/test split.
    #[arg(long, default_value_t = 42)]
    pub split_seed: u64,

    /// Boosting rounds.
    #[arg(long, default_value_t = 500)]
    pub rounds: usize,

    #[arg(long, default_value_t = 0.05)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 5)]
    pub max_depth: usize,

    #[arg(long, default_value_t = 5.0)]
    pub min_child_weight: f64,

    /// Row fraction sampled per tree.
    #[arg(long, default_value_t = 0.8)]
    pub subsample: f64,

    /// Column fraction sampled per tree.
    #[arg(long, default_value_t = 0.8)]
    pub colsample_bytree: f64,

    /// Minimum gain required to keep a split.
    #[arg(long, default_value_t = 1.0)]
    pub gamma: f64,

    /// L2 regularization on leaf weights.
    #[arg(long, default_value_t = 1.0)]
    pub lambda: f64,

    /// Positive-class weight. Defaults to negatives/positives on the training split.
    #[arg(long)]
    pub scale_pos_weight: Option<f64>,

    /// Seed for row/column subsampling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "CREDIT_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    #[arg(long, env = "CREDIT_MAPPINGS_PATH", default_value = DEFAULT_MAPPINGS_PATH)]
    pub mappings: PathBuf,

    #[arg(long, env = "CREDIT_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "CREDIT_PORT", default_value_t = 8000)]
    pub port: u16,
}

#[derive(Debug, Parser, Clone)]
pub struct ScoreArgs {
    /// JSON file with one loan application (same body as `POST /predict`).
    #[arg(long, value_name = "JSON")]
    pub input: PathBuf,

    #[arg(long, env = "CREDIT_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    #[arg(long, env = "CREDIT_MAPPINGS_PATH", default_value = DEFAULT_MAPPINGS_PATH)]
    pub mappings: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn train_defaults() {
        let cli = Cli::parse_from(["credit", "train", "--processed", "p.csv", "--model", "m.json"]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.rounds, 500);
        assert_eq!(args.max_depth, 5);
        assert_eq!(args.scale_pos_weight, None);
        assert_eq!(args.processed, PathBuf::from("p.csv"));
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::parse_from([
            "credit", "-v", "serve", "--host", "127.0.0.1", "--port", "9000", "--model", "m.json", "--mappings",
            "l.json",
        ]);
        assert_eq!(cli.verbose, 1);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.host, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(args.port, 9000);
    }
}
