//! Core batch processor for parallel execution.

use crate::batch::error::BatchError;
use crate::batch::types::{BatchProgress, BatchResult, ProgressCallback};
use futures::FutureExt;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error};

/// Runs every item exactly once with at most `concurrency` in flight.
///
/// There is no retry and no batch-level timeout; a failing or panicking item is
/// recorded with its index and the rest of the batch carries on.
pub struct BatchProcessor<T, R> {
    concurrency: usize,
    semaphore: Arc<Semaphore>,
    _phantom: PhantomData<(T, R)>,
}

/// Shared state behind one lock so counters and results move together.
struct BatchState<R> {
    successful: Vec<(usize, R)>,
    failed: Vec<BatchError>,
    completed: usize,
    active: usize,
}

impl<R> BatchState<R> {
    fn snapshot(&self, index: usize, total: usize) -> BatchProgress {
        BatchProgress {
            index,
            completed: self.completed,
            total,
            active: self.active,
            successful: self.successful.len(),
            failed: self.failed.len(),
        }
    }
}

impl<T, R> BatchProcessor<T, R>
where
    T: Send + Debug + 'static,
    R: Send + 'static,
{
    pub fn new(concurrency: usize) -> Result<Self, BatchError> {
        if concurrency == 0 {
            return Err(BatchError::InvalidConfig("concurrency must be at least 1".to_string()));
        }
        Ok(Self { concurrency, semaphore: Arc::new(Semaphore::new(concurrency)), _phantom: PhantomData })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process a batch of items concurrently.
    ///
    /// Results are collected in completion order. `progress_callback` is invoked
    /// once per item after its outcome has been recorded.
    pub async fn process_batch<F, Fut>(
        &self,
        items: Vec<T>,
        processor: F,
        progress_callback: Option<ProgressCallback>,
    ) -> BatchResult<R>
    where
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = Result<R, String>> + Send + 'static,
    {
        let start_time = Instant::now();
        let total = items.len();

        if total == 0 {
            return BatchResult::new(vec![], vec![], start_time.elapsed());
        }

        debug!(total_items = total, concurrency = self.concurrency, "Starting batch processing");

        let state = Arc::new(Mutex::new(BatchState {
            successful: Vec::with_capacity(total),
            failed: Vec::new(),
            completed: 0,
            active: 0,
        }));

        let mut handles = Vec::with_capacity(total);

        for (index, item) in items.into_iter().enumerate() {
            let processor = processor.clone();
            let semaphore = Arc::clone(&self.semaphore);
            let state = Arc::clone(&state);
            let progress_callback = progress_callback.clone();

            let handle = tokio::spawn(async move {
                let input = format!("{item:?}");

                let permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(e) => {
                        error!(index, "Failed to acquire semaphore: {}", e);
                        let mut guard = state.lock().await;
                        guard.failed.push(BatchError::ItemError {
                            index,
                            input,
                            error: format!("Semaphore error: {e}"),
                            error_type: "SemaphoreError".to_string(),
                        });
                        guard.completed += 1;
                        let snapshot = guard.snapshot(index, total);
                        drop(guard);
                        if let Some(cb) = &progress_callback {
                            cb(snapshot);
                        }
                        return;
                    }
                };

                state.lock().await.active += 1;

                let outcome = AssertUnwindSafe(processor(item)).catch_unwind().await;
                drop(permit);

                let mut guard = state.lock().await;
                guard.active -= 1;
                guard.completed += 1;
                match outcome {
                    Ok(Ok(result)) => guard.successful.push((index, result)),
                    Ok(Err(e)) => {
                        error!(index, error = %e, "Batch item failed");
                        guard.failed.push(BatchError::ItemError {
                            index,
                            input,
                            error: e,
                            error_type: "ProcessingError".to_string(),
                        });
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(index, error = %message, "Batch item panicked");
                        guard.failed.push(BatchError::ItemError {
                            index,
                            input,
                            error: message,
                            error_type: "Panic".to_string(),
                        });
                    }
                }
                let snapshot = guard.snapshot(index, total);
                drop(guard);

                if let Some(cb) = &progress_callback {
                    cb(snapshot);
                }
            });

            handles.push((index, handle));
        }

        // Join barrier
        for (index, handle) in handles {
            if let Err(e) = handle.await {
                error!(index, "Task join error: {}", e);
                state.lock().await.failed.push(BatchError::ItemError {
                    index,
                    input: String::new(),
                    error: e.to_string(),
                    error_type: "JoinError".to_string(),
                });
            }
        }

        let total_duration = start_time.elapsed();
        let (successful, failed) = {
            let mut guard = state.lock().await;
            (std::mem::take(&mut guard.successful), std::mem::take(&mut guard.failed))
        };

        debug!(
            total_items = total,
            successful = successful.len(),
            failed = failed.len(),
            duration_ms = total_duration.as_millis() as u64,
            "Batch processing completed"
        );

        BatchResult::new(successful, failed, total_duration)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
