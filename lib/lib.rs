//! fcache shared library.
//!
//! A bounded-memory byte cache for files that fills itself from a single background loader.
//! Callers enqueue load requests with [`cache::manager::CacheManager::request`] and later poll
//! for availability; reads of already-cached data never wait on disk I/O.

/// Caching primitives: the LRU store, the request queue, the loader and the facade.
pub mod cache;
/// Virtual path normalization.
pub mod path;
pub mod sync;

pub use cache::manager::{CacheManager, CacheStatus, ManagerConfig};
