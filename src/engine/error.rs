//! Error types for the batching engine

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Failure attributed to a whole dispatched batch.
///
/// One instance is shared (behind an `Arc`) by every request of the batch
/// that produced it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend returned an error for the whole call
    #[error("backend `{backend}` failed: {message}")]
    Inference { backend: String, message: String },

    /// The backend returned a different number of outputs than it was given inputs
    #[error("backend returned {actual} outputs for a batch of {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The backend panicked while running the batch
    #[error("backend panicked: {0}")]
    Panicked(String),
}

/// Errors observed by callers of the executor
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// The caller's own deadline elapsed before its result arrived.
    /// The request still runs to completion; the caller just stops waiting.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("batch inference failed: {0}")]
    Backend(Arc<BackendError>),

    #[error("executor is closed")]
    Closed,

    /// The producing side went away without resolving the request
    #[error("request was dropped before a result was produced")]
    Abandoned,

    #[error("failed to start batch worker: {0}")]
    Startup(String),

    #[error("invalid batch configuration: {0}")]
    InvalidConfig(String),
}

impl ExecError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::Timeout(_))
    }

    /// The shared batch failure, if this is one
    pub fn backend_error(&self) -> Option<&Arc<BackendError>> {
        match self {
            ExecError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for ExecError {
    fn from(err: BackendError) -> Self {
        ExecError::Backend(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ExecError::Timeout(Duration::from_millis(5));
        assert_eq!(err.to_string(), "request timed out after 5ms");

        let err: ExecError = BackendError::LengthMismatch { expected: 3, actual: 2 }.into();
        assert_eq!(
            err.to_string(),
            "batch inference failed: backend returned 2 outputs for a batch of 3"
        );
    }

    #[test]
    fn test_backend_error_is_shared_on_clone() {
        let err: ExecError = BackendError::Panicked("boom".to_string()).into();
        let cloned = err.clone();
        assert!(Arc::ptr_eq(
            err.backend_error().unwrap(),
            cloned.backend_error().unwrap()
        ));
        assert!(!cloned.is_timeout());
    }
}
