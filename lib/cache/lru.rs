//! Size-bounded LRU byte store.

use std::sync::PoisonError;

use bytes::Bytes;
use hashlink::LinkedHashMap;
use tracing::{debug, trace};

use crate::cache::traits::{SyncReadableCache, SyncWritableCache};
use crate::sync::{Mutex, MutexGuard};

/// A cached file body together with its exact byte length.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Bytes,
    size: usize,
}

impl CacheEntry {
    fn new(data: Bytes) -> Self {
        let size = data.len();
        Self { data, size }
    }
}

#[derive(Debug)]
struct LruState {
    /// Entries ordered by recency. The front is the least recently used key, the back the most
    /// recently used one. Map membership and recency position live in one structure, so they can
    /// never disagree.
    entries: LinkedHashMap<String, CacheEntry>,

    /// Sum of `size` over every entry in `entries`.
    current_size: usize,
}

/// A bounded key to bytes store that evicts in least-recently-used order.
///
/// All operations take a single internal mutex and never perform I/O while holding it. Values are
/// handed out as [`Bytes`], so a reader keeps its data alive even if the entry is evicted right
/// after the lookup.
///
/// A single value larger than `max_size` is still admitted: the eviction loop only runs while the
/// cache is non-empty, so it drains everything and then inserts the oversized value, leaving
/// `current_size` above `max_size` until the next insert of a new key evicts it.
#[derive(Debug)]
pub struct LruCache {
    max_size: usize,
    state: Mutex<LruState>,
}

impl LruCache {
    /// Create an empty cache that holds at most `max_size` bytes (modulo a single oversized
    /// entry).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            state: Mutex::new(LruState {
                entries: LinkedHashMap::new(),
                current_size: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configured byte budget.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether an entry for `key` exists. Does not touch recency.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Fetch the data for `key` and mark it most recently used.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut guard = self.lock();
        let (key, entry) = guard.entries.remove_entry(key)?;
        let data = entry.data.clone();
        guard.entries.insert(key, entry);
        Some(data)
    }

    /// Insert `data` under `key` as the most recently used entry.
    ///
    /// Overwriting an existing key replaces its data, adjusts the running size by the delta and
    /// refreshes its recency; it never evicts. A new key first evicts from the least recently used
    /// end until it fits or the cache is empty.
    pub fn insert(&self, key: String, data: Bytes) {
        let entry = CacheEntry::new(data);
        let size = entry.size;

        let mut guard = self.lock();
        let state = &mut *guard;

        if let Some(previous) = state.entries.remove(&key) {
            state.current_size = state.current_size - previous.size + size;
            trace!(key = %key, old_size = previous.size, new_size = size, "Replaced cache entry.");
            state.entries.insert(key, entry);
            return;
        }

        while !state.entries.is_empty() && state.current_size.saturating_add(size) > self.max_size
        {
            let Some((victim, evicted)) = state.entries.pop_front() else {
                break;
            };
            state.current_size -= evicted.size;
            debug!(key = %victim, size = evicted.size, "Evicted least recently used entry.");
        }

        if size > self.max_size {
            debug!(
                key = %key,
                size,
                max_size = self.max_size,
                "Admitting entry larger than the cache budget."
            );
        }

        state.entries.insert(key, entry);
        state.current_size += size;
    }

    /// Exact number of bytes currently held.
    #[must_use]
    pub fn current_size(&self) -> usize {
        self.lock().current_size
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// All keys, most recently used first. Intended for diagnostics.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .rev()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl SyncReadableCache<String, Bytes> for LruCache {
    fn contains(&self, key: &String) -> bool {
        Self::contains(self, key)
    }
}

impl SyncWritableCache<String, Bytes> for LruCache {
    fn insert(&self, key: String, value: Bytes) {
        Self::insert(self, key, value);
    }
}
