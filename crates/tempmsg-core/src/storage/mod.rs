//! Expiring text storage keyed by Sonyflake IDs.
//!
//! ## Structure
//!
//! - [`Storage`] - the contract consumed by the request layer.
//! - [`DefaultStorage`] - derives keys from a shared generator and delegates
//!   persistence and expiry to a [`Backend`].
//! - [`RedisBackend`] - production backend.
//! - [`MemoryBackend`] - in-process backend with a clock tests can advance.

mod memory;
mod redis_backend;
mod service;

use core::{future::Future, time::Duration};

use crate::Result;

pub use memory::*;
pub use redis_backend::*;
pub use service::*;

/// Short-lived, key-addressable text storage.
///
/// Implementations are shared across request handlers and must be safe for
/// concurrent use. Timeouts are applied by callers around the returned
/// futures; dropping one does not cancel a backend call already in flight.
pub trait Storage: Send + Sync {
    /// Stores `value` for `ttl` and returns the generated key.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidTtl`] if `ttl` is zero.
    /// - [`StorageError::Generation`] if no identifier could be produced.
    /// - [`StorageError::Backend`] if the write failed. The identifier is
    ///   discarded.
    ///
    /// [`StorageError::InvalidTtl`]: crate::StorageError::InvalidTtl
    /// [`StorageError::Generation`]: crate::StorageError::Generation
    /// [`StorageError::Backend`]: crate::StorageError::Backend
    fn put(&self, value: &str, ttl: Duration) -> impl Future<Output = Result<String>> + Send;

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if the key is absent or expired.
    /// - [`StorageError::Backend`] for any other backend failure.
    ///
    /// [`StorageError::NotFound`]: crate::StorageError::NotFound
    /// [`StorageError::Backend`]: crate::StorageError::Backend
    fn get(&self, key: &str) -> impl Future<Output = Result<String>> + Send;
}

/// A key-value store that enforces expiry itself.
pub trait Backend: Send + Sync {
    /// Writes `value` under `key`, expiring after `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Duration)
    -> impl Future<Output = Result<()>> + Send;

    /// Reads `key`, returning `None` if it is absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}
