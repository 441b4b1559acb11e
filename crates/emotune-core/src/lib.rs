//! Emotune Core
//!
//! Orchestration on top of the training primitives: the bounded batch
//! executor, the corpus preparation pipeline, external training and merge
//! backends, and layered configuration.

pub mod batch;
pub mod config;
pub mod pipeline;
pub mod training;

pub use batch::{
    BatchError, BatchProcessor, BatchProgress, BatchProgressTracker, BatchResult, ProgressCallback, format_duration,
};
pub use config::{ConfigError, EmotuneConfig, PrepareMode};
pub use pipeline::{Annotator, PipelineError, Reasoning, RunReport, prepare_corpus};
pub use training::{CommandSpec, ExternalMerger, ExternalTrainer, MergeOutcome};
