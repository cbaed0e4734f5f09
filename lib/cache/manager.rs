//! The caller-facing cache facade.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use tracing::debug;

use crate::cache::loader::{BackgroundLoader, LoaderStats, SpawnError};
use crate::cache::lru::LruCache;
use crate::path::normalize;
use crate::sync::Arc;

/// Default aggregate byte budget: 4 GiB.
pub const DEFAULT_MEMORY_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

/// Default advisory read granularity: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Construction-time settings for a [`CacheManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Maximum aggregate size of cached data, in bytes.
    pub memory_limit: usize,
    /// Advisory read granularity in bytes. Files are always read whole.
    pub chunk_size: usize,
    /// Initial directory that virtual paths are resolved against.
    pub root: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            memory_limit: usize::try_from(DEFAULT_MEMORY_LIMIT).unwrap_or(usize::MAX),
            chunk_size: DEFAULT_CHUNK_SIZE,
            root: PathBuf::from("."),
        }
    }
}

/// A point-in-time view of the cache and the loader queue.
///
/// The individual fields are each read under their own lock, so the snapshot as a whole is not
/// transactionally consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    /// Cached keys, most recently used first.
    pub cached: Vec<String>,
    /// Queued keys, oldest first.
    pub pending: Vec<String>,
    /// Total bytes held by the cache.
    pub total_size: usize,
    /// Loader counters.
    pub loader: LoaderStats,
}

impl fmt::Display for CacheStatus {
    #[expect(
        clippy::cast_precision_loss,
        reason = "display only; megabyte precision is plenty"
    )]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let megabytes = self.total_size as f64 / (1024.0 * 1024.0);
        writeln!(
            f,
            "Cache: {megabytes:.2} MB | Files: {}",
            self.cached.join(", ")
        )?;
        write!(f, "Queue: {}", self.pending.join(", "))
    }
}

/// A self-populating file cache.
///
/// [`CacheManager::request`] enqueues a load and returns at once; a dedicated background thread
/// reads the file and inserts it. [`CacheManager::lookup`] and [`CacheManager::read_range`] only
/// consult the in-memory store, so they never wait on disk. A key whose load has not completed
/// yet simply reads as absent and callers are expected to poll.
///
/// Every operation takes the caller's virtual path and normalizes it first, so `"/a\\b.txt"` and
/// `"a/b.txt"` are interchangeable.
#[derive(Debug)]
pub struct CacheManager {
    cache: Arc<LruCache>,
    loader: BackgroundLoader,
    chunk_size: usize,
}

impl CacheManager {
    /// Create the cache and start its loader thread.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] if the loader thread cannot be started.
    pub fn new(config: ManagerConfig) -> Result<Self, SpawnError> {
        let cache = Arc::new(LruCache::new(config.memory_limit));
        let loader = BackgroundLoader::spawn(Arc::clone(&cache), config.root)?;
        debug!(
            memory_limit = config.memory_limit,
            chunk_size = config.chunk_size,
            "Started cache manager."
        );
        Ok(Self {
            cache,
            loader,
            chunk_size: config.chunk_size,
        })
    }

    /// Enqueue `path` for loading and return immediately.
    pub fn request(&self, path: &str) {
        self.loader.request(normalize(path));
    }

    /// Whether `path` is cached right now. Does not enqueue a load or refresh recency.
    #[must_use]
    pub fn lookup(&self, path: &str) -> bool {
        self.cache.contains(&normalize(path))
    }

    /// Read up to `length` bytes of `path` starting at `offset`.
    ///
    /// Returns an empty buffer if `path` is not cached or `offset` is at or past the end of its
    /// data. Otherwise the slice is clamped to the data; it is never padded. A hit refreshes the
    /// entry's recency.
    #[must_use]
    pub fn read_range(&self, path: &str, offset: usize, length: usize) -> Bytes {
        let Some(data) = self.cache.get(&normalize(path)) else {
            return Bytes::new();
        };
        if offset >= data.len() {
            return Bytes::new();
        }
        let end = offset.saturating_add(length).min(data.len());
        data.slice(offset..end)
    }

    /// Snapshot the cached keys, the pending queue and the loader counters.
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            cached: self.cache.keys(),
            pending: self.loader.pending(),
            total_size: self.cache.current_size(),
            loader: self.loader.stats(),
        }
    }

    /// Change the directory that subsequently dequeued requests resolve against.
    pub fn set_root(&self, root: impl Into<PathBuf>) {
        self.loader.set_root(root.into());
    }

    /// The directory requests currently resolve against.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.loader.root()
    }

    /// The cache's byte budget.
    #[must_use]
    pub fn memory_limit(&self) -> usize {
        self.cache.max_size()
    }

    /// The advisory read granularity this manager was configured with.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Stop the loader thread, abandoning queued requests. Dropping the manager does the same.
    pub fn shutdown(mut self) {
        self.loader.shutdown();
    }
}
