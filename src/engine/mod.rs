//! Micro-batching inference engine
//!
//! Coalesces requests from many concurrent callers into bounded batches and
//! runs them through a single backend on one dedicated worker thread:
//! - Size- and delay-bounded batch collection
//! - Whole-batch success or failure, never partial
//! - Per-caller timeouts that never cancel in-flight work

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handle;
pub mod queue;
pub mod stats;

pub use batch::{Batch, BatchCollector};
pub use dispatch::BatchDispatcher;
pub use error::{BackendError, ExecError};
pub use executor::{BatchConfig, Executor};
pub use handle::{result_slot, ResultHandle, Resolver};
pub use queue::{PendingRequest, SubmissionQueue};
pub use stats::{ExecutorStats, StatsSnapshot};
