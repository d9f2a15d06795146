//! sentinel - command-line detection over CSV files
//!
//! Usage:
//!   sentinel detect --input prices.csv --models ./artifacts --pretty
//!   sentinel detect --input - < prices.csv
//!   sentinel inspect --models ./artifacts

use clap::{Parser, Subcommand};
use ohlcv_sentinel::{ForecastAnchor, Sentinel, SentinelConfig};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Anomaly detection over daily OHLCV bars")]
struct Cli {
    /// JSON config file (model paths, window length, forecast anchor)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a CSV file and print the response JSON
    Detect {
        /// CSV file, or `-` for stdin
        #[arg(short, long)]
        input: String,

        /// Model directory (overrides config and environment)
        #[arg(short, long)]
        models: Option<PathBuf>,

        /// Sliding window length
        #[arg(long)]
        window_len: Option<usize>,

        /// Re-seed the forecaster every N rows instead of once from the tail
        #[arg(long)]
        reanchor_every: Option<usize>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Load the models and print what was loaded
    Inspect {
        /// Model directory (overrides config and environment)
        #[arg(short, long)]
        models: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => match SentinelConfig::from_file(path) {
            Ok(config) => config.with_env_overrides(),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => SentinelConfig::from_env(),
    };

    match cli.command {
        Commands::Detect {
            input,
            models,
            window_len,
            reanchor_every,
            pretty,
        } => {
            let mut config = with_models(base, models);
            if let Some(len) = window_len {
                config.pipeline.window_len = len;
            }
            if let Some(every) = reanchor_every {
                config.pipeline.forecast_anchor = match every {
                    0 => ForecastAnchor::Tail,
                    every => ForecastAnchor::Rolling { every },
                };
            }
            run_detect(&config, &input, pretty)
        }
        Commands::Inspect { models } => run_inspect(&with_models(base, models)),
    }
}

fn with_models(config: SentinelConfig, models: Option<PathBuf>) -> SentinelConfig {
    match models {
        Some(dir) => config.with_model_dir(dir),
        None => config,
    }
}

fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
    }
}

fn run_detect(config: &SentinelConfig, input: &str, pretty: bool) -> ExitCode {
    // the CLI fails fast on missing models instead of degrading
    let sentinel = match Sentinel::load(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading models: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let csv = match read_input(input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {}", input, e);
            return ExitCode::FAILURE;
        }
    };

    let response = sentinel.evaluate(&csv);
    let json = if pretty {
        serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_json())
    } else {
        response.to_json()
    };
    println!("{}", json);

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_inspect(config: &SentinelConfig) -> ExitCode {
    match Sentinel::load(config) {
        Ok(sentinel) => {
            let summary = serde_json::json!({
                "model_dir": config.model_dir,
                "models": sentinel.registry().summary(),
                "pipeline": sentinel.options(),
            });
            match serde_json::to_string_pretty(&summary) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error loading models: {}", e);
            ExitCode::FAILURE
        }
    }
}
