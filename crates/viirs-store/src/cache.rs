//! Load-once, process-lifetime cache keyed by dataset.
//!
//! Each key is decoded at most once on success. Concurrent first requests
//! for the same key share a single in-flight load and all observe its result,
//! whether that is the cached value or the error. A failed load leaves no
//! entry behind, so the next request starts a fresh attempt.
//!
//! ## Structure
//!
//! - `ready`: completed entries, never evicted or replaced
//! - `in_flight`: one shared future per key currently loading
//!
//! A load publishes into `ready` before it leaves `in_flight`, and new loads
//! are only started from a vacant `in_flight` slot after re-checking `ready`,
//! so a completed key is never decoded twice.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use darkness_common::LightPollutionResult;

type SharedLoad<V> = Shared<BoxFuture<'static, LightPollutionResult<Arc<V>>>>;

/// Result of asking a store to load a dataset key.
#[derive(Debug)]
pub enum LoadOutcome<V> {
    /// The key routed to a dataset and its entry is cached.
    Loaded(Arc<V>),
    /// The key names no configured dataset; nothing was loaded or cached.
    Unknown,
}

impl<V> LoadOutcome<V> {
    pub fn loaded(&self) -> Option<&Arc<V>> {
        match self {
            LoadOutcome::Loaded(value) => Some(value),
            LoadOutcome::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, LoadOutcome::Unknown)
    }
}

impl<V> Clone for LoadOutcome<V> {
    fn clone(&self) -> Self {
        match self {
            LoadOutcome::Loaded(value) => LoadOutcome::Loaded(Arc::clone(value)),
            LoadOutcome::Unknown => LoadOutcome::Unknown,
        }
    }
}

/// Statistics for a dataset cache.
///
/// All fields are atomic for lock-free reads from status endpoints.
#[derive(Debug, Default)]
pub struct DatasetCacheStats {
    /// Requests answered from a completed entry
    pub hits: AtomicU64,
    /// Requests that started a new load
    pub loads: AtomicU64,
    /// Requests that joined a load already in flight
    pub coalesced: AtomicU64,
    /// Loads that ended in an error
    pub failures: AtomicU64,
}

struct Inner<V> {
    ready: DashMap<String, Arc<V>>,
    in_flight: DashMap<String, SharedLoad<V>>,
    stats: DatasetCacheStats,
}

/// Single-flight cache of immutable dataset entries.
pub struct DatasetCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Default for DatasetCache<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> DatasetCache<V>
where
    V: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                ready: DashMap::new(),
                in_flight: DashMap::new(),
                stats: DatasetCacheStats::default(),
            }),
        }
    }

    /// Get a completed entry without triggering a load.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.inner.ready.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Get the entry for `key`, running `load` if no entry exists and no
    /// load is in flight.
    ///
    /// `load` is called at most once per attempt; callers that arrive while
    /// it runs wait for the same result.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> LightPollutionResult<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LightPollutionResult<V>> + Send + 'static,
    {
        if let Some(value) = self.get(key) {
            self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let pending = match self.inner.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                self.inner.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Joining in-flight dataset load");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // A load may have finished between the first check and
                // taking this slot.
                if let Some(value) = self.get(key) {
                    self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }

                self.inner.stats.loads.fetch_add(1, Ordering::Relaxed);
                let pending = Self::start_load(Arc::clone(&self.inner), key.to_string(), load());
                entry.insert(pending.clone());
                pending
            }
        };

        pending.await
    }

    fn start_load<Fut>(inner: Arc<Inner<V>>, key: String, load: Fut) -> SharedLoad<V>
    where
        Fut: Future<Output = LightPollutionResult<V>> + Send + 'static,
    {
        async move {
            let result = load.await.map(Arc::new);
            match &result {
                Ok(value) => {
                    inner.ready.insert(key.clone(), Arc::clone(value));
                }
                Err(_) => {
                    inner.stats.failures.fetch_add(1, Ordering::Relaxed);
                }
            }
            inner.in_flight.remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    /// Keys with a completed entry.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.ready.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.ready.is_empty()
    }

    /// Number of keys currently loading.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn stats(&self) -> &DatasetCacheStats {
        &self.inner.stats
    }
}
