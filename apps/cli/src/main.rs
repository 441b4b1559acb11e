//! Emotune CLI - build emotion-reasoning corpora and fine-tune on them
//!
//! Provides the `emotune` command: corpus preparation against a local
//! inference server, LoRA fine-tuning and adapter merging through external
//! tooling.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{MergeArgs, PrepareArgs, TrainCommand, labels, merge, prepare, train};

/// Emotune - emotion classification fine-tuning toolkit
#[derive(Parser, Debug)]
#[command(
    name = "emotune",
    author,
    version,
    about = "Emotune - emotion corpus preparation and fine-tuning",
    long_about = "Emotune turns a multi-label emotion dataset into an instruction-tuning corpus with\nmodel-written reasoning, then drives LoRA fine-tuning and adapter merging."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Extra configuration file layered over ~/.emotune/config.toml and ./emotune.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an annotated training corpus
    ///
    /// Selects rows from a local dataset export (balanced or full), asks the
    /// inference model for a one-sentence reasoning per row and writes one
    /// JSON record per line.
    Prepare(Box<PrepareArgs>),

    /// Show the emotion categories with their polarity and priority rank
    Labels {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fine-tuning jobs
    #[command(subcommand)]
    Train(TrainCommand),

    /// Merge a trained adapter into its base model
    Merge(MergeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so `--json` output on stdout stays parseable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Prepare(prepare_args) => prepare::execute(*prepare_args, config).await,
        Command::Labels { json } => labels::execute(&config, json),
        Command::Train(command) => train::execute(command, config).await,
        Command::Merge(merge_args) => merge::execute(merge_args, config).await,
    }
}
