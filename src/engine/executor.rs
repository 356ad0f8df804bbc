//! Batching executor
//!
//! Public entry point of the engine. Any number of threads or async tasks
//! submit payloads; one dedicated worker thread owns the backend, collects
//! batches from the submission queue and dispatches them.
//!
//! Shutdown: [`Executor::close`] stops new submissions, lets the worker
//! drain and complete everything already queued, then joins the worker.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::Backend;

use super::batch::BatchCollector;
use super::dispatch::BatchDispatcher;
use super::error::ExecError;
use super::handle::{result_slot, ResultHandle};
use super::queue::{PendingRequest, SubmissionQueue};
use super::stats::{ExecutorStats, StatsSnapshot};

const WORKER_THREAD_NAME: &str = "rovoice-batch-worker";

/// Batching parameters, fixed for an executor's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    pub max_delay: Duration,
    /// Default per-call timeout for callers that do not pick their own
    pub request_timeout: Duration,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.max_batch_size == 0 {
            return Err(ExecError::InvalidConfig("max_batch_size must be at least 1".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ExecError::InvalidConfig("request_timeout must be positive".into()));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 8,
            max_delay: Duration::from_millis(5),
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// Micro-batching executor over a single backend
pub struct Executor<I, O> {
    queue: Arc<SubmissionQueue<PendingRequest<I, O>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config: BatchConfig,
    stats: Arc<ExecutorStats>,
    backend_name: String,
}

impl<I, O> Executor<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Start an executor whose callers receive the backend outputs unchanged.
    ///
    /// `factory` runs on the worker thread, so the backend it builds never
    /// has to cross threads.
    pub fn spawn<B, F>(config: BatchConfig, factory: F) -> Result<Self, ExecError>
    where
        B: Backend<Input = I, Output = O> + 'static,
        F: FnOnce() -> Result<B> + Send + 'static,
    {
        Self::spawn_with_postprocess(config, factory, |out: O| out)
    }

    /// Start an executor that maps each backend output through `postprocess`
    /// on the worker thread before handing it to its caller.
    pub fn spawn_with_postprocess<B, F, P>(
        config: BatchConfig,
        factory: F,
        postprocess: P,
    ) -> Result<Self, ExecError>
    where
        B: Backend<Input = I> + 'static,
        F: FnOnce() -> Result<B> + Send + 'static,
        P: FnMut(B::Output) -> O + Send + 'static,
    {
        config.validate()?;

        let queue = Arc::new(SubmissionQueue::new());
        let stats = Arc::new(ExecutorStats::default());
        let collector = BatchCollector::new(config.max_batch_size, config.max_delay);
        let (ready_tx, ready_rx) = result_slot::<String>();

        let worker = {
            let queue = queue.clone();
            let stats = stats.clone();
            thread::Builder::new()
                .name(WORKER_THREAD_NAME.to_string())
                .spawn(move || {
                    let backend = match factory() {
                        Ok(backend) => backend,
                        Err(e) => {
                            ready_tx.fail(ExecError::Startup(format!("{:#}", e)));
                            return;
                        }
                    };
                    let mut dispatcher = BatchDispatcher::new(backend, postprocess, stats);
                    ready_tx.resolve(dispatcher.backend_name().to_string());

                    run_worker(&collector, &queue, &mut dispatcher);
                })
                .map_err(|e| ExecError::Startup(e.to_string()))?
        };

        // Model loading can take a while; there is no sensible bound here
        let backend_name = match ready_rx.wait(Duration::MAX) {
            Ok(name) => name,
            Err(e) => {
                queue.close();
                if worker.join().is_err() {
                    warn!("Batch worker panicked during startup");
                }
                return Err(e);
            }
        };

        info!(
            "Batch executor started (backend: {}, max_batch_size: {}, max_delay: {:?})",
            backend_name, config.max_batch_size, config.max_delay
        );

        Ok(Self {
            queue,
            worker: Mutex::new(Some(worker)),
            config,
            stats,
            backend_name,
        })
    }

    fn enqueue(&self, payload: I) -> Result<ResultHandle<O>, ExecError> {
        let (resolver, handle) = result_slot();
        match self.queue.push(PendingRequest::new(payload, resolver)) {
            Ok(()) => {
                self.stats.record_submitted();
                Ok(handle)
            }
            Err(rejected) => {
                self.stats.record_rejected();
                // Resolve explicitly rather than letting the drop report Abandoned
                rejected.resolver.fail(ExecError::Closed);
                Err(ExecError::Closed)
            }
        }
    }

    /// Submit a payload and block the calling thread until its result arrives
    /// or `timeout` elapses.
    ///
    /// A timeout does not cancel the request: it still runs with its batch,
    /// and its result is discarded.
    pub fn submit(&self, payload: I, timeout: Duration) -> Result<O, ExecError> {
        self.enqueue(payload)?.wait(timeout)
    }

    /// Async counterpart of [`submit`](Self::submit); waits without blocking
    /// a runtime thread.
    pub async fn submit_async(&self, payload: I, timeout: Duration) -> Result<O, ExecError> {
        self.enqueue(payload)?.wait_async(timeout).await
    }

    /// Stop accepting submissions, finish everything already queued, and
    /// join the worker. Idempotent.
    pub fn close(&self) {
        self.queue.close();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            debug!("Waiting for batch worker to drain {} queued requests", self.queue.len());
            if worker.join().is_err() {
                warn!("Batch worker panicked");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<I, O> Drop for Executor<I, O> {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(worker) = self.worker.get_mut().take() {
            let _ = worker.join();
        }
    }
}

fn run_worker<B, P, O>(
    collector: &BatchCollector,
    queue: &SubmissionQueue<PendingRequest<B::Input, O>>,
    dispatcher: &mut BatchDispatcher<B, P>,
) where
    B: Backend,
    P: FnMut(B::Output) -> O,
{
    info!("Starting batch worker");
    while let Some(batch) = collector.collect(queue) {
        dispatcher.dispatch(batch);
    }
    info!("Batch worker stopped");
}
