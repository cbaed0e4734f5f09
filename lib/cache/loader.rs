//! The single background worker that fills the cache from disk.
//!
//! The worker drains a [`RequestQueue`] in FIFO order. For every request it resolves the key
//! against the current root directory, skips keys that are already cached, and otherwise reads
//! the whole file and inserts it. Failures are logged and counted but never stop the worker and
//! never reach the code that enqueued the request.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use std::thread::JoinHandle;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::cache::queue::RequestQueue;
use crate::cache::traits::{SyncReadableCache, SyncWritableCache};
use crate::sync::atomic::{AtomicU64, Ordering};
use crate::sync::{Arc, RwLock};

/// Name given to the loader's OS thread.
pub const LOADER_THREAD_NAME: &str = "fcache-loader";

/// Reasons a single request failed to populate the cache.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The resolved path does not exist.
    #[error("File {0} does not exist")]
    NotFound(PathBuf),

    /// The path exists but is a directory or other non-regular file.
    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),

    /// The path exists but its metadata could not be read.
    #[error("Failed to stat {path}: {source}")]
    Metadata {
        /// Resolved path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file exists but could not be opened.
    #[error("Failed to open file {path}: {source}")]
    Open {
        /// Resolved path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Reading the opened file failed part way.
    #[error("Failed to read file {path}: {source}")]
    Read {
        /// Resolved path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file yielded fewer bytes than its reported size. Nothing is cached.
    #[error("Read size mismatch for {path}: expected {expected}, got {actual}")]
    ShortRead {
        /// Resolved path.
        path: PathBuf,
        /// Size reported by the file's metadata.
        expected: u64,
        /// Bytes actually read.
        actual: u64,
    },

    /// The file's size does not fit in this platform's address space.
    #[error("File {path} is {size} bytes, which cannot be addressed in memory")]
    TooLarge {
        /// Resolved path.
        path: PathBuf,
        /// Size reported by the file's metadata.
        size: u64,
    },
}

/// The worker thread could not be started.
#[derive(Debug, Error)]
#[error("Failed to spawn the loader thread: {0}")]
pub struct SpawnError(#[from] std::io::Error);

/// What happened to a request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read in full and inserted.
    Loaded {
        /// Number of bytes inserted.
        size: usize,
    },
    /// The key was already cached, so the file was not read again.
    AlreadyCached,
}

/// Point-in-time counters describing the loader's work so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Requests that ended with a successful insert.
    pub loaded: u64,
    /// Requests skipped because the key was already cached.
    pub skipped: u64,
    /// Requests that failed with a [`LoadError`].
    pub failed: u64,
    /// Every request taken off the queue, whatever the outcome.
    pub processed: u64,
}

#[derive(Debug)]
struct Counters {
    loaded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    processed: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            loaded: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            processed: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> LoaderStats {
        LoaderStats {
            loaded: self.loaded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            // Acquire pairs with the Release bump in `service`, so a caller that sees the count
            // also sees the cache insert that preceded it.
            processed: self.processed.load(Ordering::Acquire),
        }
    }
}

/// Map a normalized key onto a real path below `root`.
///
/// Keys are joined as relative paths even if they still carry a leading slash (a virtual path
/// with two leading slashes normalizes to one), so a key can never replace the root wholesale.
#[must_use]
pub fn resolve(root: &Path, key: &str) -> PathBuf {
    root.join(key.trim_start_matches('/'))
}

/// Load one file into `cache` under `key`.
///
/// This is the body of a single loader iteration, exposed so callers can run a load inline.
///
/// # Errors
///
/// Returns a [`LoadError`] when the file is missing or not a regular file, cannot be opened or
/// read, or yields fewer bytes than its reported size. The cache is left untouched in every error case.
pub fn load_file<C>(cache: &C, root: &Path, key: &str) -> Result<LoadOutcome, LoadError>
where
    C: SyncReadableCache<String, Bytes> + SyncWritableCache<String, Bytes> + ?Sized,
{
    let path = resolve(root, key);

    let expected = match std::fs::metadata(&path) {
        Ok(meta) if !meta.is_file() => return Err(LoadError::NotAFile(path)),
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::NotFound(path));
        }
        Err(source) => return Err(LoadError::Metadata { path, source }),
    };

    let key = key.to_owned();
    if cache.contains(&key) {
        return Ok(LoadOutcome::AlreadyCached);
    }

    let opened = File::open(&path);
    read_into(cache, key, path, opened, expected)
}

/// Read exactly `expected` bytes from an opened source and insert them under `key`.
///
/// Nothing is inserted unless the whole body was read.
fn read_into<C, R>(
    cache: &C,
    key: String,
    path: PathBuf,
    opened: std::io::Result<R>,
    expected: u64,
) -> Result<LoadOutcome, LoadError>
where
    C: SyncWritableCache<String, Bytes> + ?Sized,
    R: Read,
{
    let reader = match opened {
        Ok(reader) => reader,
        Err(source) => return Err(LoadError::Open { path, source }),
    };
    let Ok(capacity) = usize::try_from(expected) else {
        return Err(LoadError::TooLarge {
            path,
            size: expected,
        });
    };

    let mut data = Vec::with_capacity(capacity);
    if let Err(source) = reader.take(expected).read_to_end(&mut data) {
        return Err(LoadError::Read { path, source });
    }

    let actual = data.len() as u64;
    if actual != expected {
        return Err(LoadError::ShortRead {
            path,
            expected,
            actual,
        });
    }

    let size = data.len();
    cache.insert(key, Bytes::from(data));
    Ok(LoadOutcome::Loaded { size })
}

struct LoaderTask<C> {
    cache: Arc<C>,
    queue: Arc<RequestQueue>,
    root: Arc<RwLock<PathBuf>>,
    counters: Arc<Counters>,
}

impl<C> LoaderTask<C>
where
    C: SyncReadableCache<String, Bytes> + SyncWritableCache<String, Bytes> + Send + Sync + 'static,
{
    fn work(&self) {
        while let Some(key) = self.queue.pop() {
            self.service(&key);
        }
        debug!("Loader received shutdown signal, stopping.");
    }

    fn service(&self, key: &str) {
        // Read once per request; a concurrent `set_root` only affects later requests.
        let root = self
            .root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match load_file(&*self.cache, &root, key) {
            Ok(LoadOutcome::Loaded { size }) => {
                debug!(key, size, "Loaded file into cache.");
                self.counters.loaded.fetch_add(1, Ordering::Relaxed);
            }
            Ok(LoadOutcome::AlreadyCached) => {
                trace!(key, "File already cached, skipping read.");
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                warn!(key, %error, "Failed to load file into cache.");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.counters.processed.fetch_add(1, Ordering::Release);
    }
}

/// Handle to the background loader thread.
///
/// Dropping the handle raises the shutdown signal and joins the thread. Requests still queued at
/// that point are abandoned.
#[derive(Debug)]
pub struct BackgroundLoader {
    queue: Arc<RequestQueue>,
    root: Arc<RwLock<PathBuf>>,
    counters: Arc<Counters>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundLoader {
    /// Start the loader thread, reading files below `root` into `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] if the OS refuses to create the thread.
    pub fn spawn<C>(cache: Arc<C>, root: PathBuf) -> Result<Self, SpawnError>
    where
        C: SyncReadableCache<String, Bytes>
            + SyncWritableCache<String, Bytes>
            + Send
            + Sync
            + 'static,
    {
        let queue = Arc::new(RequestQueue::new());
        let root = Arc::new(RwLock::new(root));
        let counters = Arc::new(Counters::new());

        let task = LoaderTask {
            cache,
            queue: Arc::clone(&queue),
            root: Arc::clone(&root),
            counters: Arc::clone(&counters),
        };
        let worker = std::thread::Builder::new()
            .name(LOADER_THREAD_NAME.to_owned())
            .spawn(move || task.work())?;

        Ok(Self {
            queue,
            root,
            counters,
            worker: Some(worker),
        })
    }

    /// Enqueue a normalized key for loading. Returns immediately.
    pub fn request(&self, key: String) {
        trace!(key = %key, "Queued load request.");
        self.queue.push(key);
    }

    /// Replace the root directory used to resolve requests dequeued from now on.
    pub fn set_root(&self, root: PathBuf) {
        debug!(root = %root.display(), "Changing loader root directory.");
        *self.root.write().unwrap_or_else(PoisonError::into_inner) = root;
    }

    /// The current root directory.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests not yet taken by the worker, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.queue.snapshot()
    }

    /// Counters describing the work done so far.
    #[must_use]
    pub fn stats(&self) -> LoaderStats {
        self.counters.snapshot()
    }

    /// Stop the worker and wait for it to exit. Idempotent.
    ///
    /// A request already being processed finishes first; anything still queued is dropped.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.queue.shutdown();
        let abandoned = self.queue.len();
        if abandoned > 0 {
            debug!(abandoned, "Abandoning queued load requests on shutdown.");
        }
        if worker.join().is_err() {
            error!("Loader thread panicked.");
        }
    }
}

impl Drop for BackgroundLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}
