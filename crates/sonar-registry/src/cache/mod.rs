//! Per-run resolution cache with request de-duplication
//!
//! The first caller for a `(name, canary)` key runs the lookup; concurrent
//! callers for the same key await that same lookup. Entries never expire:
//! a cache lives exactly as long as the resolver that owns it.

use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

type CacheKey = (String, Option<String>);

/// Lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to `get_or_resolve`
    pub lookups: u64,
    /// Lookups that actually ran the resolver
    pub fetches: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.lookups - self.fetches
    }
}

/// De-duplicating cache of resolved versions
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<CacheKey, Arc<OnceCell<Option<String>>>>,
    lookups: AtomicU64,
    fetches: AtomicU64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for the key, running `fetch` only if no
    /// caller has started it yet
    pub async fn get_or_resolve<F, Fut>(&self, name: &str, canary: Option<&str>, fetch: F) -> Option<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<String>>,
    {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        // Clone the cell out so the shard lock is not held across the await
        let cell = self
            .entries
            .entry((name.to_string(), canary.map(str::to_string)))
            .or_default()
            .clone();

        cell.get_or_init(|| async {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            fetch().await
        })
        .await
        .clone()
    }

    /// Settled result for a key, if any
    pub fn get(&self, name: &str, canary: Option<&str>) -> Option<Option<String>> {
        self.entries
            .get(&(name.to_string(), canary.map(str::to_string)))
            .and_then(|cell| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }
}
