//! Command-line argument types shared by the subcommands.

use clap::{Args, Subcommand, ValueEnum};
use emotune_core::PrepareMode;
use emotune_training::SourceFormat;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// At most --quota rows per dominant emotion
    Balanced,
    /// Every row, optionally capped by --limit
    Full,
}

impl From<ModeArg> for PrepareMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Balanced => Self::Balanced,
            ModeArg::Full => Self::Full,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Jsonl,
    Tsv,
    Csv,
}

impl From<FormatArg> for SourceFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Jsonl => Self::Jsonl,
            FormatArg::Tsv => Self::Tsv,
            FormatArg::Csv => Self::Csv,
        }
    }
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Source dataset export (.jsonl, .tsv or .csv)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Source format when it cannot be inferred from the extension
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Selection mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Per-category cap (balanced mode)
    #[arg(long)]
    pub quota: Option<usize>,

    /// Shuffle seed (balanced mode)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use only the first N rows (full mode)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Concurrent inference requests
    #[arg(long)]
    pub workers: Option<usize>,

    /// Output corpus path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Inference engine (ollama, mock)
    #[arg(long)]
    pub engine: Option<String>,

    /// Inference model
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama server URL
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum TrainCommand {
    /// Run a LoRA fine-tuning job through the configured training command
    Run {
        /// Annotated corpus (defaults to the prepare output)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Base model to adapt
        #[arg(long)]
        base_model: Option<String>,

        /// Workspace root holding .emotune/jobs
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        #[arg(long)]
        epochs: Option<u32>,

        #[arg(long)]
        max_steps: Option<u64>,

        #[arg(long)]
        learning_rate: Option<f64>,

        /// Kill the training command after this many seconds
        #[arg(long)]
        max_seconds: Option<u64>,

        /// Output the manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// List finished fine-tuning jobs
    List {
        /// Workspace root holding .emotune/jobs
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Adapter directory to merge
    #[arg(long, conflicts_with = "job")]
    pub adapter_dir: Option<PathBuf>,

    /// Merge the adapter of a finished job instead
    #[arg(long)]
    pub job: Option<String>,

    /// Workspace root used to resolve --job
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,

    /// Merged model output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub base_model: Option<String>,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}
