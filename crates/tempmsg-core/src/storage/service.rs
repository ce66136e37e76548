use core::time::Duration;
use std::sync::Arc;

use tempmsg_id::{SonyflakeGenerator, TimeSource};

use crate::{
    Result, StorageError,
    storage::{Backend, Storage},
};

/// The [`Storage`] implementation: Sonyflake keys over a [`Backend`].
///
/// Holds no mutable state of its own. The generator is shared by reference
/// count so several services (or other callers) can draw from one
/// instance, which keeps IDs unique per machine ID.
pub struct DefaultStorage<B, T>
where
    T: TimeSource,
{
    backend: B,
    generator: Arc<SonyflakeGenerator<T>>,
}

impl<B, T> DefaultStorage<B, T>
where
    B: Backend,
    T: TimeSource,
{
    pub fn new(generator: Arc<SonyflakeGenerator<T>>, backend: B) -> Self {
        Self { backend, generator }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B, T> Storage for DefaultStorage<B, T>
where
    B: Backend,
    T: TimeSource + Send + Sync,
{
    async fn put(&self, value: &str, ttl: Duration) -> Result<String> {
        if ttl.is_zero() {
            return Err(StorageError::InvalidTtl);
        }

        let id = self
            .generator
            .next_id_async()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to generate id"))?;
        let key = id.to_string();

        self.backend
            .set(&key, value, ttl)
            .await
            .inspect_err(|e| tracing::error!(error = %e, %key, "Failed to set key"))?;

        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(%key, ttl_ms, "Stored value");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<String> {
        match self.backend.get(key).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(StorageError::NotFound {
                key: key.to_owned(),
            }),
            Err(e) => {
                tracing::error!(error = %e, %key, "Failed to get key");
                Err(e)
            }
        }
    }
}
