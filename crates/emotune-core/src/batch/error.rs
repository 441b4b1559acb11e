//! Error types for batch processing.

use thiserror::Error;

/// Errors that can occur during batch processing.
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    /// An error occurred processing a specific item.
    #[error("Item {index} failed ({error_type}): {error} (input: {input})")]
    ItemError {
        /// Index of the item that failed.
        index: usize,
        /// Input that caused the error.
        input: String,
        /// Error message.
        error: String,
        /// Type of error.
        error_type: String,
    },
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BatchError {
    /// Index of the failed item, if this error belongs to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::ItemError { index, .. } => Some(*index),
            Self::InvalidConfig(_) => None,
        }
    }
}
