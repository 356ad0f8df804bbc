//! Single-assignment result slot
//!
//! A slot is split into a [`Resolver`] (write side, owned by the batch worker)
//! and a [`ResultHandle`] (read side, owned by the submitting caller). Both
//! halves are consumed by their terminal operation, so a slot is written at
//! most once and read at most once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use super::error::ExecError;

enum State<T> {
    Pending,
    Ready(Result<T, ExecError>),
    Taken,
}

struct Slot<T> {
    state: Mutex<State<T>>,
    // Blocking readers wait here
    ready: Condvar,
    // Async readers wait here; notify_one stores a permit if nobody is waiting yet
    notify: Notify,
}

impl<T> Slot<T> {
    fn complete(&self, result: Result<T, ExecError>) {
        {
            let mut state = self.state.lock();
            assert!(
                matches!(*state, State::Pending),
                "result slot completed more than once"
            );
            *state = State::Ready(result);
        }
        self.ready.notify_one();
        self.notify.notify_one();
    }

    fn try_take(&self) -> Option<Result<T, ExecError>> {
        let mut state = self.state.lock();
        take_ready(&mut state)
    }
}

fn take_ready<T>(state: &mut State<T>) -> Option<Result<T, ExecError>> {
    match std::mem::replace(state, State::Taken) {
        State::Ready(result) => Some(result),
        other => {
            *state = other;
            None
        }
    }
}

/// Create a connected resolver / handle pair
pub fn result_slot<T>() -> (Resolver<T>, ResultHandle<T>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(State::Pending),
        ready: Condvar::new(),
        notify: Notify::new(),
    });
    (
        Resolver {
            slot: Some(slot.clone()),
        },
        ResultHandle { slot },
    )
}

/// Write side of a result slot.
///
/// Dropping a resolver without calling [`resolve`](Self::resolve) or
/// [`fail`](Self::fail) fails the slot with [`ExecError::Abandoned`].
pub struct Resolver<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Resolver<T> {
    pub fn resolve(mut self, value: T) {
        if let Some(slot) = self.slot.take() {
            slot.complete(Ok(value));
        }
    }

    pub fn fail(mut self, err: ExecError) {
        if let Some(slot) = self.slot.take() {
            slot.complete(Err(err));
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.complete(Err(ExecError::Abandoned));
        }
    }
}

/// Read side of a result slot
pub struct ResultHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> ResultHandle<T> {
    /// Whether a terminal state has been reached
    pub fn is_ready(&self) -> bool {
        matches!(*self.slot.state.lock(), State::Ready(_))
    }

    /// Block until the slot is completed or `timeout` elapses.
    ///
    /// A timeout too large to represent as a deadline waits indefinitely.
    pub fn wait(self, timeout: Duration) -> Result<T, ExecError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.slot.state.lock();

        loop {
            if let Some(result) = take_ready(&mut state) {
                return result;
            }

            match deadline {
                Some(deadline) => {
                    if self.slot.ready.wait_until(&mut state, deadline).timed_out() {
                        return take_ready(&mut state).unwrap_or(Err(ExecError::Timeout(timeout)));
                    }
                }
                None => self.slot.ready.wait(&mut state),
            }
        }
    }

    /// Await the slot from an async context without blocking the runtime
    pub async fn wait_async(self, timeout: Duration) -> Result<T, ExecError> {
        let deadline = tokio::time::Instant::now().checked_add(timeout);

        loop {
            if let Some(result) = self.slot.try_take() {
                return result;
            }

            match deadline {
                Some(deadline) => {
                    let notified = self.slot.notify.notified();
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return self
                            .slot
                            .try_take()
                            .unwrap_or(Err(ExecError::Timeout(timeout)));
                    }
                }
                None => self.slot.notify.notified().await,
            }
        }
    }
}
