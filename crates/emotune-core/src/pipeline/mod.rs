//! Corpus preparation pipeline.

pub mod annotator;
pub mod assembler;

pub use annotator::{Annotator, DEFAULT_FALLBACK_TEMPLATE, Reasoning};
pub use assembler::{PipelineError, PipelineResult, RunReport, prepare_corpus};
