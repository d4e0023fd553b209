//! zsbench CLI - zero-shot classification accuracy for vision-language embeddings.
//!
//! Scores precomputed image embeddings against embedded class labels and
//! reports top-1, top-5 and top-15 accuracy.
//!
//! # Usage
//!
//! ```bash
//! # Evaluate with a local CLIP text encoder
//! zsbench evaluate val.jsonl --labels classes.txt --prompt "a photo of a {}"
//!
//! # Evaluate with precomputed label embeddings, writing per-example predictions
//! zsbench evaluate val.jsonl --labels classes.txt \
//!     --label-embeddings label_embeddings.jsonl --predictions preds.jsonl
//!
//! # Build a label bank once, then reuse it across runs
//! zsbench labels encode --labels classes.txt --prompt "a photo of a {}" --output classes.bin
//! zsbench evaluate val.jsonl --labels classes.txt --prompt "a photo of a {}" \
//!     --label-bank classes.bin
//!
//! # View configuration
//! zsbench config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// zsbench - zero-shot top-1/5/15 accuracy for embedding models.
#[derive(Parser, Debug)]
#[command(name = "zsbench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a dataset of image embeddings against a label set
    Evaluate(cli::evaluate::EvaluateArgs),

    /// Build and cache label embeddings
    Labels(cli::labels::LabelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match zsbench_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `zsbench config path`."
            );
            zsbench_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("zsbench v{}", zsbench_core::VERSION);

    match cli.command {
        Commands::Evaluate(args) => cli::evaluate::execute(args, config).await,
        Commands::Labels(args) => cli::labels::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
