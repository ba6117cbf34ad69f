//! In-process cache for catalog lookups.
//!
//! Entries live for a fixed TTL and are keyed by an md5 digest of the
//! lookup parameters. The map sits behind a read-mostly `RwLock`: readers
//! never block each other, and a few seconds of staleness is acceptable
//! for catalog metadata.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::models::BookRecord;

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired
    Expired,
}

/// Cached value: a page of records or a single optional record
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Records(Vec<BookRecord>),
    Single(Option<BookRecord>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: Instant,
    value: CachedValue,
}

/// TTL cache shared by [`crate::sources::CachedSource`] wrappers
#[derive(Debug)]
pub struct SearchCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl SearchCache {
    /// Create a cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: 1024,
        }
    }

    /// Create a cache from the `[cache]` configuration section
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut cache = Self::new(Duration::from_secs(config.ttl_seconds));
        cache.max_entries = config.max_entries.max(1);
        cache
    }

    /// Build the key for one lookup
    pub fn key(source: &str, operation: &str, parts: &[&str]) -> String {
        let input = format!("{}|{}|{}", source, operation, parts.join("|"));
        format!("{:x}", md5::compute(input.as_bytes()))
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> CacheResult<CachedValue> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| {
            tracing::warn!("search cache lock poisoned, recovering");
            poisoned.into_inner()
        });

        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                tracing::debug!(key, "cache hit");
                CacheResult::Hit(entry.value.clone())
            }
            Some(_) => {
                tracing::debug!(key, "cache expired");
                CacheResult::Expired
            }
            None => CacheResult::Miss,
        }
    }

    /// Store a value, evicting expired entries when the cache is full
    pub fn insert(&self, key: String, value: CachedValue) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| {
            tracing::warn!("search cache lock poisoned, recovering");
            poisoned.into_inner()
        });

        if entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
            if entries.len() >= self.max_entries {
                entries.clear();
            }
        }

        entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
