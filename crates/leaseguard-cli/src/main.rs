//! CLI for Leaseguard lease contradiction detection

mod input;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leaseguard_core::{StrategyKind, TfIdfVectorizer};
use leaseguard_runtime::{CancelHandle, ContradictionDetector, RuntimeConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use input::load_clauses;
use output::{render_report, render_similarity, OutputFormat};

#[derive(Parser)]
#[command(name = "leaseguard")]
#[command(about = "Find contradictory clauses in a lease", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect contradictory clause pairs
    Analyze {
        /// Clause file (.json list or numbered plain text)
        file: PathBuf,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Detection strategy (statistical, model-based)
        #[arg(short, long)]
        strategy: Option<StrategyKind>,

        /// Flag pairs with TF-IDF similarity below this (statistical)
        #[arg(long)]
        similarity_threshold: Option<f64>,

        /// Report pairs with contradiction probability above this (model-based)
        #[arg(long)]
        contradiction_threshold: Option<f64>,

        /// Maximum oracle requests in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Stop the analysis after this long (e.g. "90s", "2m")
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print the pairwise TF-IDF similarity matrix
    Similarity {
        /// Clause file (.json list or numbered plain text)
        file: PathBuf,

        /// YAML configuration file (vectorizer settings)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the normalized clauses as JSON
    Split {
        /// Clause file (.json list or numbered plain text)
        file: PathBuf,
    },

    /// Print the default configuration as YAML
    Config,
}

fn init_tracing() {
    // Targets are module paths, so "leaseguard" covers every workspace crate.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leaseguard=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            config,
            strategy,
            similarity_threshold,
            contradiction_threshold,
            concurrency,
            timeout,
            format,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            if let Some(threshold) = similarity_threshold {
                config.similarity_threshold = threshold;
            }
            if let Some(threshold) = contradiction_threshold {
                config.contradiction_threshold = threshold;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if timeout.is_some() {
                config.analysis_timeout = timeout;
            }
            config.validate().context("Invalid configuration")?;

            let clauses = load_clauses(&file)?;
            let detector =
                ContradictionDetector::from_config(config).context("Failed to set up detector")?;

            let cancel = CancelHandle::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, finishing with partial results");
                    on_interrupt.cancel();
                }
            });

            let report = detector.analyze_with_cancel(clauses, &cancel).await;
            println!("{}", render_report(&report, format)?);
        }

        Commands::Similarity { file, config } => {
            let config = load_config(config.as_ref())?;
            let clauses = load_clauses(&file)?;
            let texts: Vec<&str> = clauses.iter().map(|c| c.text.as_str()).collect();

            let matrix = TfIdfVectorizer::new(config.vectorizer).similarity_matrix(&texts);
            if matrix.is_none() {
                tracing::warn!(
                    clauses = clauses.len(),
                    "Need at least two clauses for a similarity matrix"
                );
            }
            println!("{}", render_similarity(&clauses, matrix.as_ref())?);
        }

        Commands::Split { file } => {
            let clauses = load_clauses(&file)?;
            println!("{}", serde_json::to_string_pretty(&clauses)?);
        }

        Commands::Config => {
            print!("{}", RuntimeConfig::default().to_yaml()?);
        }
    }

    Ok(())
}
