//! Progress tracking for batch processing.

use crate::batch::types::BatchProgress;
use std::time::{Duration, Instant};

/// Tracks progress of batch execution.
#[derive(Debug, Clone)]
pub struct BatchProgressTracker {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Items not yet started.
    pub queued: usize,
    pub successful: usize,
    pub failed: usize,
    pub start_time: Instant,
}

impl BatchProgressTracker {
    pub fn new(total: usize) -> Self {
        Self { total, completed: 0, active: 0, queued: total, successful: 0, failed: 0, start_time: Instant::now() }
    }

    /// Adopts the snapshot's total, so a tracker may start before the item count is known.
    pub fn update(&mut self, progress: &BatchProgress) {
        self.total = progress.total;
        self.completed = progress.completed;
        self.active = progress.active;
        self.queued = self.total.saturating_sub(progress.completed + progress.active);
        self.successful = progress.successful;
        self.failed = progress.failed;
    }

    /// Estimated time remaining, extrapolated from the mean rate so far.
    ///
    /// Returns a string like "2m 15s", or "calculating..." before the first completion.
    pub fn calculate_eta(&self) -> String {
        if self.completed == 0 {
            return "calculating...".to_string();
        }

        let per_item = self.start_time.elapsed().as_secs_f64() / self.completed as f64;
        let remaining = self.total.saturating_sub(self.completed);
        format_duration(Duration::from_secs_f64(per_item * remaining as f64))
    }
}

/// Format duration as human-readable string.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    if minutes > 0 { format!("{}m {}s", minutes, seconds) } else { format!("{}s", seconds) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(completed: usize, active: usize, successful: usize, failed: usize) -> BatchProgress {
        BatchProgress { index: 0, completed, total: 100, active, successful, failed }
    }

    #[test]
    fn test_progress_tracker_new() {
        let tracker = BatchProgressTracker::new(100);
        assert_eq!(tracker.total, 100);
        assert_eq!(tracker.completed, 0);
        assert_eq!(tracker.queued, 100);
        assert_eq!(tracker.calculate_eta(), "calculating...");
    }

    #[test]
    fn test_progress_tracker_update() {
        let mut tracker = BatchProgressTracker::new(100);
        tracker.update(&progress(45, 5, 42, 3));
        assert_eq!(tracker.completed, 45);
        assert_eq!(tracker.active, 5);
        assert_eq!(tracker.queued, 50);
        assert_eq!(tracker.successful, 42);
        assert_eq!(tracker.failed, 3);
    }

    #[test]
    fn test_tracker_adopts_total_from_snapshot() {
        let mut tracker = BatchProgressTracker::new(0);
        tracker.update(&BatchProgress { index: 0, completed: 1, total: 7, active: 2, successful: 1, failed: 0 });
        assert_eq!(tracker.total, 7);
        assert_eq!(tracker.queued, 4);
        assert_ne!(tracker.calculate_eta(), "calculating...");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
        assert_eq!(format_duration(Duration::from_secs(9)), "9s");
    }
}
