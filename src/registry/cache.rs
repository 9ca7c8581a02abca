//! In-memory TTL cache for registry metadata.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::error::RegistryError;
use super::Metadata;

struct CacheEntry {
    metadata: Metadata,
    /// `None` when the TTL is too large to represent; such entries never expire.
    expires_at: Option<Instant>,
}

/// Per-client metadata cache keyed by `name@version`.
///
/// The lock only guards map lookups and inserts; fetches run outside it, so
/// concurrent misses for the same key may each hit the network.
pub struct MetadataCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn key(name: &str, version: &str) -> String {
        format!("{name}@{version}")
    }

    /// Return a live entry, evicting it if expired.
    pub fn get(&self, key: &str) -> Option<Metadata> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| Instant::now() < at) => {
                Some(entry.metadata.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, metadata: Metadata) {
        let entry = CacheEntry {
            metadata,
            expires_at: Instant::now().checked_add(self.ttl),
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache-first lookup.
    ///
    /// Only a successful fetch is stored. A fetch future that is dropped
    /// before completing never reaches the insert.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        name: &str,
        version: &str,
        fetch: F,
    ) -> Result<Metadata, RegistryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Metadata, RegistryError>>,
    {
        let key = Self::key(name, version);
        if let Some(hit) = self.get(&key) {
            tracing::debug!(%key, source = "cache", "registry metadata cache hit");
            return Ok(hit);
        }

        let metadata = fetch().await?;
        self.insert(key, metadata.clone());
        Ok(metadata)
    }
}
