//! Submission queue
//!
//! Unbounded multi-producer queue drained by the single batch worker.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::handle::Resolver;

/// A single unit of work waiting for the batch worker
pub struct PendingRequest<I, O> {
    pub payload: I,
    pub resolver: Resolver<O>,
    pub enqueued_at: Instant,
}

impl<I, O> PendingRequest<I, O> {
    pub fn new(payload: I, resolver: Resolver<O>) -> Self {
        Self {
            payload,
            resolver,
            enqueued_at: Instant::now(),
        }
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Queue shared between submitting callers and the batch worker
pub struct SubmissionQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> SubmissionQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue an item. Never blocks; hands the item back once the queue is closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(item);
            }
            state.items.push_back(item);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Block until an item is available.
    /// Returns `None` once the queue is closed and fully drained.
    pub fn pop_blocking(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Wait at most `timeout` for an item
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.pop_blocking();
        };

        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return state.items.pop_front();
            }
        }
    }

    /// Take an item only if one is already queued
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Stop accepting new items. Items already queued can still be popped.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl<T> Default for SubmissionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
