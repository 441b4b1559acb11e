//! Command implementations for the Emotune CLI.

pub mod labels;
pub mod merge;
pub mod prepare;
pub mod train;
pub mod types;

pub use types::{MergeArgs, PrepareArgs, TrainCommand};
