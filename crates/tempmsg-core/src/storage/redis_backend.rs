use core::time::Duration;

use redis::{AsyncCommands, Client, aio::ConnectionManager};

use crate::{Result, StorageError, storage::Backend};

/// Redis-backed [`Backend`].
///
/// Records are plain string keys written with `PSETEX`, so Redis owns
/// expiry. The [`ConnectionManager`] multiplexes one connection and reconnects
/// on failure; cloning it per call is cheap.
#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Connects to the Redis server at `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| StorageError::Backend {
            context: format!("invalid Redis URL: {e}"),
        })?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StorageError::Backend {
                context: format!("Redis connection failed: {e}"),
            })?;

        tracing::info!("Connected to Redis");
        Ok(Self { manager })
    }
}

impl Backend for RedisBackend {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        // PSETEX rejects zero, so sub-millisecond TTLs round up.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        conn.pset_ex::<_, _, ()>(key, value, millis)
            .await
            .map_err(|e| StorageError::Backend {
                context: format!("Redis PSETEX failed: {e}"),
            })
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();

        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| StorageError::Backend {
                context: format!("Redis GET failed: {e}"),
            })
    }
}
