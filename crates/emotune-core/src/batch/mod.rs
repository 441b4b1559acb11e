//! Bounded fan-out execution of async work items.

pub mod error;
pub mod processor;
pub mod progress;
pub mod types;

pub use error::BatchError;
pub use processor::BatchProcessor;
pub use progress::{BatchProgressTracker, format_duration};
pub use types::{BatchProgress, BatchResult, ProgressCallback};
