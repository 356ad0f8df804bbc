//! Batch dispatch
//!
//! Runs one backend call per batch and fans the outputs back out to the
//! waiting callers. A batch either succeeds as a whole or every request in it
//! fails with the same shared error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::backend::Backend;

use super::batch::Batch;
use super::error::{BackendError, ExecError};
use super::queue::PendingRequest;
use super::stats::ExecutorStats;

/// Owns the backend; lives on the batch worker thread
pub struct BatchDispatcher<B, P> {
    backend: B,
    postprocess: P,
    stats: Arc<ExecutorStats>,
}

impl<B, P, O> BatchDispatcher<B, P>
where
    B: Backend,
    P: FnMut(B::Output) -> O,
{
    pub fn new(backend: B, postprocess: P, stats: Arc<ExecutorStats>) -> Self {
        Self {
            backend,
            postprocess,
            stats,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run `batch` through the backend and resolve every request in it
    pub fn dispatch(&mut self, batch: Batch<PendingRequest<B::Input, O>>) {
        let size = batch.len();
        let oldest_wait = batch
            .iter()
            .map(|r| r.enqueued_at.elapsed())
            .max()
            .unwrap_or_default();

        let (payloads, resolvers): (Vec<_>, Vec<_>) = batch
            .into_inner()
            .into_iter()
            .map(|r| (r.payload, r.resolver))
            .unzip();

        self.stats.record_batch(size);
        let start = Instant::now();

        let backend = &mut self.backend;
        let postprocess = &mut self.postprocess;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<Vec<O>, BackendError> {
            let outputs = backend.infer(&payloads).map_err(|e| BackendError::Inference {
                backend: backend.name().to_string(),
                message: format!("{:#}", e),
            })?;

            if outputs.len() != size {
                return Err(BackendError::LengthMismatch {
                    expected: size,
                    actual: outputs.len(),
                });
            }

            Ok(outputs.into_iter().map(|out| postprocess(out)).collect())
        }));
        let result = outcome.unwrap_or_else(|payload| Err(BackendError::Panicked(panic_message(payload.as_ref()))));

        match result {
            Ok(outputs) => {
                debug!(
                    "Batch of {} done in {:?} (oldest request waited {:?})",
                    size,
                    start.elapsed(),
                    oldest_wait
                );
                for (resolver, output) in resolvers.into_iter().zip(outputs) {
                    resolver.resolve(output);
                }
                self.stats.record_completed(size);
            }
            Err(err) => {
                warn!("Batch of {} failed: {}", size, err);
                let err = ExecError::Backend(Arc::new(err));
                for resolver in resolvers {
                    resolver.fail(err.clone());
                }
                self.stats.record_failed(size);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
