//! Concurrency-bounded FIFO task queue.
//!
//! [`TaskQueue`] bounds how many asynchronous tasks run at once using a fair
//! semaphore: at most `concurrency` submitted tasks are in flight at any
//! instant, additional submissions wait in submission order, and the
//! completion of any running task (success or failure) immediately admits
//! the next waiter. Every submitted task runs exactly once and the
//! submission future resolves with the task's own output.
//!
//! Independent pipelines build their own instances: interactive browsing
//! tolerates a wider ceiling than bulk retrieval, which deliberately runs
//! serial (see [`crate::archive`]).
//!
//! # Example
//!
//! ```
//! use gallery_core::queue::TaskQueue;
//!
//! # async fn example() -> Result<(), gallery_core::queue::QueueError> {
//! let queue = TaskQueue::new(4)?;
//! let value = queue.submit(|| async { 40 + 2 }).await;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Error type for queue construction.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Bounds how many submitted tasks run at once.
///
/// Cloning is cheap and clones share the same ceiling; submissions from any
/// clone compete for the same permits.
///
/// # Ordering
///
/// The underlying semaphore is fair: waiters acquire permits in the order
/// their submissions first polled, so tasks start in FIFO order subject to
/// the concurrency ceiling.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl TaskQueue {
    /// Creates a queue admitting at most `concurrency` tasks at once.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    pub fn new(concurrency: usize) -> Result<Self, QueueError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(QueueError::InvalidConcurrency { value: concurrency });
        }
        debug!(concurrency, "creating task queue");
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency ceiling.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns how many submitted tasks are currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.concurrency - self.semaphore.available_permits()
    }

    /// Runs `task` once a permit is available and resolves with its output.
    ///
    /// The permit is held for the task's whole duration and released when it
    /// completes, admitting the next waiter. The task's outcome, success or
    /// failure alike, travels back to the submitter untouched.
    pub async fn submit<T, F, Fut>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let Ok(_permit) = self.semaphore.acquire().await else {
            // The semaphore lives exactly as long as the queue and is never
            // explicitly closed.
            unreachable!("task queue semaphore closed");
        };
        task().await
    }
}
