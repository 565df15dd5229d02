//! pricecast - next-day / next-week close forecaster
//!
//! # Usage
//! ```sh
//! pricecast predict --symbol AAPL --csv data/AAPL.csv --headlines news.json
//! pricecast train --symbol AAPL --csv data/
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr.
//!
//! # Environment Variables
//! - `PRICECAST_*` - forecasting configuration (see `ForecastConfig`)
//! - `PRICECAST_METRICS_ENABLED` - print Prometheus metrics to stderr on exit
//! - `RUST_LOG` - log filter

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pricecast::application::forecasting::ForecastService;
use pricecast::application::sentiment::HeadlineSentimentAggregator;
use pricecast::config::{ForecastConfig, ModelPolicy};
use pricecast::domain::forecasting::ForecastOutcome;
use pricecast::domain::market::normalize_symbol;
use pricecast::domain::ports::PriceHistoryProvider;
use pricecast::domain::sentiment::NEUTRAL_SENTIMENT;
use pricecast::infrastructure::{
    CsvHistoryProvider, FileModelStore, JsonHeadlineProvider, SentimentAnalyzer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file; environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the model store directory
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast the next-day and next-week close
    Predict {
        #[arg(short, long)]
        symbol: String,

        /// CSV file, or a directory holding <SYMBOL>.csv
        #[arg(long)]
        csv: PathBuf,

        /// JSON array of headlines to score
        #[arg(long, conflicts_with = "sentiment")]
        headlines: Option<PathBuf>,

        /// Precomputed sentiment in [0, 1]
        #[arg(long)]
        sentiment: Option<f64>,

        /// cache-models or always-retrain
        #[arg(long)]
        policy: Option<ModelPolicy>,
    },
    /// Train and store models regardless of the cache policy
    Train {
        #[arg(short, long)]
        symbol: String,

        #[arg(long)]
        csv: PathBuf,
    },
}

fn history_provider(path: &Path) -> CsvHistoryProvider {
    if path.is_dir() {
        CsvHistoryProvider::from_directory(path)
    } else {
        CsvHistoryProvider::from_file(path)
    }
}

fn load_config(cli: &Cli) -> Result<ForecastConfig> {
    let mut config = match &cli.config {
        Some(path) => ForecastConfig::from_toml_file(path)?,
        None => ForecastConfig::from_env()?,
    };
    if let Some(dir) = &cli.model_dir {
        config.model_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs on stderr so stdout carries only JSON
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    if let Commands::Predict {
        policy: Some(policy),
        ..
    } = &cli.command
    {
        config.model_policy = *policy;
    }

    info!(
        "pricecast {} (store: {:?}, policy: {})",
        env!("CARGO_PKG_VERSION"),
        config.model_dir,
        config.model_policy
    );

    let metrics_enabled = config.observability.enabled;
    let store = Arc::new(FileModelStore::new(&config.model_dir)?);
    let service = ForecastService::new(config, store)?;

    let succeeded = match &cli.command {
        Commands::Predict {
            symbol,
            csv,
            headlines,
            sentiment,
            ..
        } => {
            let provider = history_provider(csv);
            let sentiment = match headlines {
                Some(path) => {
                    let aggregator = HeadlineSentimentAggregator::new(Arc::new(SentimentAnalyzer::new()));
                    match aggregator.sentiment_for(&JsonHeadlineProvider::new(path), symbol) {
                        Ok(summary) => {
                            info!(
                                "Sentiment {:.3} ({}) from {} headlines",
                                summary.score,
                                summary.classification,
                                summary.headlines.len()
                            );
                            Some(summary.score)
                        }
                        Err(e) => {
                            warn!("Headlines unavailable, using neutral sentiment: {}", e);
                            Some(NEUTRAL_SENTIMENT)
                        }
                    }
                }
                None => *sentiment,
            };

            let outcome = service.forecast_from(&provider, symbol, sentiment);
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Failed to serialize forecast")?
            );
            matches!(outcome, ForecastOutcome::Ok(_))
        }
        Commands::Train { symbol, csv } => {
            let symbol = normalize_symbol(symbol)?;
            let bars = history_provider(csv).fetch_history(&symbol)?;
            let report = service.train(&symbol, &bars)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
            true
        }
    };

    if metrics_enabled {
        eprintln!("{}", service.metrics().render());
    }

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
