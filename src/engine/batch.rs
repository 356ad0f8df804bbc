//! Batch collection
//!
//! Drains the submission queue into bounded batches. The delay window opens
//! when the first request of a batch is pulled, so the first request never
//! waits longer than `max_delay` for company.

use std::time::{Duration, Instant};

use tracing::trace;

use super::queue::SubmissionQueue;

/// An ordered, non-empty group of queued requests
#[derive(Debug)]
pub struct Batch<T> {
    items: Vec<T>,
}

impl<T> Batch<T> {
    fn new(items: Vec<T>) -> Self {
        debug_assert!(!items.is_empty(), "batch must not be empty");
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

/// Size- and delay-bounded batch collector
#[derive(Debug, Clone, Copy)]
pub struct BatchCollector {
    max_batch_size: usize,
    max_delay: Duration,
}

impl BatchCollector {
    pub fn new(max_batch_size: usize, max_delay: Duration) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            max_delay,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Collect the next batch.
    ///
    /// Blocks until at least one item is queued. Returns `None` only when the
    /// queue has been closed and drained.
    pub fn collect<T>(&self, queue: &SubmissionQueue<T>) -> Option<Batch<T>> {
        let first = queue.pop_blocking()?;

        let mut items = Vec::with_capacity(self.max_batch_size);
        items.push(first);
        let deadline = Instant::now() + self.max_delay;

        while items.len() < self.max_batch_size {
            let remaining = deadline.saturating_duration_since(Instant::now());

            // Once the window is spent, only take what is already waiting
            let next = if remaining.is_zero() {
                queue.try_pop()
            } else {
                queue.pop_timeout(remaining)
            };

            match next {
                Some(item) => items.push(item),
                None => break,
            }
        }

        trace!(
            size = items.len(),
            max = self.max_batch_size,
            "Batch collected"
        );
        Some(Batch::new(items))
    }
}
