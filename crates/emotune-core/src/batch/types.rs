//! Data types for batch processing.

use crate::batch::error::BatchError;
use std::sync::Arc;
use std::time::Duration;

/// Result of batch processing.
#[derive(Debug, Clone)]
pub struct BatchResult<R> {
    /// Successfully processed items in completion order, tagged with their input index.
    pub successful: Vec<(usize, R)>,
    /// Failed items with error details.
    pub failed: Vec<BatchError>,
    /// Total duration of batch processing.
    pub total_duration: Duration,
    /// Success rate as a percentage (0.0 to 100.0).
    pub success_rate: f64,
}

impl<R> BatchResult<R> {
    pub fn new(successful: Vec<(usize, R)>, failed: Vec<BatchError>, total_duration: Duration) -> Self {
        let total = successful.len() + failed.len();
        let success_rate = if total > 0 { (successful.len() as f64 / total as f64) * 100.0 } else { 0.0 };

        Self { successful, failed, total_duration, success_rate }
    }

    pub fn total_items(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Snapshot handed to the progress callback after each item settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Input index of the item that just finished.
    pub index: usize,
    pub completed: usize,
    pub total: usize,
    pub active: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Progress callback function type.
pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;
