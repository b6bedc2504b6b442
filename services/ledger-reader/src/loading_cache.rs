//! Loading cache with single-flight loads
//!
//! Every key owns a slot guarded by its own async mutex. A miss holds the
//! slot lock across the loader, so concurrent requests for the same key
//! wait for that one load and then read its result. Replay writes take the
//! same lock, which serializes them against loads and refreshes of the key
//! without blocking any other key.
//!
//! Size is bounded by admission order (oldest admitted key evicted first);
//! entries can optionally expire a fixed time after they were written.

use std::collections::VecDeque;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex as KeyLock, OwnedMutexGuard};
use tokio::time::Instant;
use types::errors::StoreError;

/// Failure to produce a cached value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The store could not be reached while loading
    #[error("unable to load data into cache: {0}")]
    StoreUnavailable(StoreError),

    #[error("cache error: {0}")]
    Load(StoreError),
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            CacheError::StoreUnavailable(err)
        } else {
            CacheError::Load(err)
        }
    }
}

/// Size and expiry policy
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of keys held at once.
    pub max_size: usize,
    /// Reload entries this long after they were written.
    pub expire_after_write: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1_000_000,
            expire_after_write: None,
        }
    }
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub load_successes: u64,
    pub load_failures: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
}

struct Loaded<V> {
    value: V,
    written_at: Instant,
}

type Slot<V> = Arc<KeyLock<Option<Loaded<V>>>>;

/// Key-value cache whose misses are filled by a caller-supplied loader
pub struct LoadingCache<K, V> {
    slots: DashMap<K, Slot<V>>,
    admission: Mutex<VecDeque<K>>,
    config: CacheConfig,
    counters: Counters,
}

impl<K, V> LoadingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            slots: DashMap::new(),
            admission: Mutex::new(VecDeque::new()),
            config,
            counters: Counters::default(),
        }
    }

    /// Return the cached value for `key`, running `load` on a miss.
    ///
    /// At most one load per key is in flight; a failed load leaves the key
    /// unloaded and hands the error to the caller.
    pub async fn get_with<F, Fut, E>(&self, key: &K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let (slot, mut state) = self.lock_current(key).await;

        if let Some(loaded) = state.as_ref() {
            if !self.is_expired(loaded) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(loaded.value.clone());
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        match load().await {
            Ok(value) => {
                self.counters.load_successes.fetch_add(1, Ordering::Relaxed);
                *state = Some(Loaded {
                    value: value.clone(),
                    written_at: Instant::now(),
                });
                Ok(value)
            }
            Err(err) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                if state.is_none() {
                    self.discard(key, &slot);
                }
                Err(err)
            }
        }
    }

    /// Reload `key` unconditionally. On failure the previous value stays.
    pub async fn refresh_with<F, Fut, E>(&self, key: &K, load: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let (slot, mut state) = self.lock_current(key).await;

        match load().await {
            Ok(value) => {
                self.counters.load_successes.fetch_add(1, Ordering::Relaxed);
                *state = Some(Loaded {
                    value,
                    written_at: Instant::now(),
                });
                Ok(())
            }
            Err(err) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                if state.is_none() {
                    self.discard(key, &slot);
                }
                Err(err)
            }
        }
    }

    /// Mutate the value for `key` in place if it is loaded.
    ///
    /// Returns what `update` returned, or `None` when the key is not loaded.
    /// Never creates an entry.
    pub async fn update_if_present<F, R>(&self, key: &K, update: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        let slot = self.slots.get(key).map(|slot| Arc::clone(slot.value()))?;
        let mut state = slot.lock().await;
        state.as_mut().map(|loaded| update(&mut loaded.value))
    }

    /// The loaded value for `key`, without loading.
    pub async fn get_if_present(&self, key: &K) -> Option<V> {
        let slot = self.slots.get(key).map(|slot| Arc::clone(slot.value()))?;
        let state = slot.lock().await;
        state.as_ref().map(|loaded| loaded.value.clone())
    }

    /// Number of keys currently admitted (loaded or loading)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            load_successes: self.counters.load_successes.load(Ordering::Relaxed),
            load_failures: self.counters.load_failures.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, loaded: &Loaded<V>) -> bool {
        match self.config.expire_after_write {
            Some(ttl) => loaded.written_at.elapsed() >= ttl,
            None => false,
        }
    }

    /// Lock the slot that is currently mapped to `key`.
    ///
    /// A waiter can wake up holding a slot that was discarded while it
    /// waited; it then starts over with the live one.
    async fn lock_current(&self, key: &K) -> (Slot<V>, OwnedMutexGuard<Option<Loaded<V>>>) {
        loop {
            let slot = self.slot(key);
            let state = Arc::clone(&slot).lock_owned().await;
            let current = self
                .slots
                .get(key)
                .is_some_and(|mapped| Arc::ptr_eq(mapped.value(), &slot));
            if current {
                return (slot, state);
            }
        }
    }

    /// Slot for `key`, admitting it if new.
    fn slot(&self, key: &K) -> Slot<V> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }

        let (slot, admitted) = match self.slots.entry(key.clone()) {
            Entry::Occupied(occupied) => (Arc::clone(occupied.get()), false),
            Entry::Vacant(vacant) => {
                let slot: Slot<V> = Arc::new(KeyLock::new(None));
                vacant.insert(Arc::clone(&slot));
                (slot, true)
            }
        };

        // The map shard is unlocked here; eviction below touches other shards.
        if admitted {
            self.admit(key.clone());
        }
        slot
    }

    /// Drop an unloaded `slot` after its load failed.
    fn discard(&self, key: &K, slot: &Slot<V>) {
        if self.slots.remove_if(key, |_, mapped| Arc::ptr_eq(mapped, slot)).is_some() {
            let mut queue = self.admission.lock().unwrap_or_else(PoisonError::into_inner);
            queue.retain(|queued| queued != key);
        }
    }

    /// Queue `key` and evict the oldest idle keys beyond `max_size`.
    ///
    /// Slots whose lock is held (a load or replay in flight) are kept, so the
    /// cache can briefly hold more than `max_size` keys.
    fn admit(&self, key: K) {
        let mut queue = self.admission.lock().unwrap_or_else(PoisonError::into_inner);
        queue.push_back(key);

        let mut busy = Vec::new();
        while queue.len() > self.config.max_size {
            let Some(oldest) = queue.pop_front() else {
                break;
            };
            let evicted = self.slots.remove_if(&oldest, |_, slot| slot.try_lock().is_ok());
            if evicted.is_some() {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            } else if self.slots.contains_key(&oldest) {
                busy.push(oldest);
            }
        }
        for key in busy.into_iter().rev() {
            queue.push_front(key);
        }
    }
}
