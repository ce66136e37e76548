use core::time::Duration;
use std::{collections::HashMap, time::Instant};

use parking_lot::Mutex;

use crate::{Result, storage::Backend};

/// In-process [`Backend`] backed by a mutex-guarded map.
///
/// Each record carries its own deadline. Expired records are evicted lazily
/// when read, or in bulk by [`MemoryBackend::purge_expired`]. The backend's
/// notion of "now" can be pushed forward with [`MemoryBackend::fast_forward`]
/// to expire records without sleeping.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    skew: Duration,
}

#[derive(Debug)]
struct Entry {
    value: String,
    /// `None` when the deadline lies beyond what an [`Instant`] can hold.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Option<Instant>) -> bool {
        match (self.expires_at, now) {
            (None, _) => true,
            // The clock was pushed past every representable instant.
            (Some(_), None) => false,
            (Some(deadline), Some(now)) => deadline > now,
        }
    }
}

impl Inner {
    fn now(&self) -> Option<Instant> {
        Instant::now().checked_add(self.skew)
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances this backend's clock by `by`.
    pub fn fast_forward(&self, by: Duration) {
        let mut inner = self.inner.lock();
        inner.skew = inner.skew.saturating_add(by);
    }

    /// Drops every expired record and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = inner.now();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.is_live(now));
        before - inner.entries.len()
    }

    /// Number of records that have not expired yet.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        let now = inner.now();
        inner
            .entries
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Backend for MemoryBackend {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock();
        let expires_at = inner.now().and_then(|now| now.checked_add(ttl));
        inner.entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock();
        let now = inner.now();
        match inner.entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                inner.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
