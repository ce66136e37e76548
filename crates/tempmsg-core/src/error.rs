//! Error types for storage and process lifecycle.
//!
//! ## Error Cases
//! - [`StorageError`]: a `put`/`get` failed. `NotFound` is kept apart from
//!   `Backend` so the request layer can answer "not found" instead of a server
//!   error.
//! - [`ShutdownError`]: the shutdown procedure failed or overran its grace
//!   period.
//! - [`LifecycleError`]: the coordinator was driven through an invalid state
//!   transition, or its shutdown failed.

use core::time::Duration;

use crate::lifecycle::LifecycleState;

/// A boxed error produced by a caller-supplied shutdown procedure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = StorageError> = core::result::Result<T, E>;

/// Errors returned by [`Storage`](crate::storage::Storage) implementations.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// No identifier could be produced for the record.
    #[error("ID generation failed: {0}")]
    Generation(#[from] tempmsg_id::Error),

    /// The backend was unreachable or rejected the operation.
    #[error("Backend error: {context}")]
    Backend { context: String },

    /// The key was never written or has expired.
    #[error("Key not found: {key}")]
    NotFound { key: String },

    /// Records must live for a positive duration.
    #[error("TTL must be positive")]
    InvalidTtl,
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// The shutdown procedure did not complete cleanly.
#[derive(thiserror::Error, Debug)]
pub enum ShutdownError {
    /// The procedure returned an error.
    #[error("Shutdown procedure failed: {source}")]
    Failed { source: BoxError },

    /// The procedure was abandoned after running past its grace period.
    #[error("Shutdown exceeded its grace period of {grace:?}")]
    GracePeriodExceeded { grace: Duration },
}

/// Errors returned by [`Lifecycle::run`](crate::lifecycle::Lifecycle::run).
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    /// The coordinator was not in the state the transition starts from.
    #[error("Invalid lifecycle transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Shutdown ran but did not complete cleanly. The coordinator is stopped.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
