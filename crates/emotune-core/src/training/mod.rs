//! Training and merge backends.

pub mod command;
pub mod external;
pub mod merger;

pub use command::CommandSpec;
pub use external::ExternalTrainer;
pub use merger::{ExternalMerger, MergeOutcome};
