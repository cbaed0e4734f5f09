/// Background file loader.
pub mod loader;
/// Size-bounded LRU byte store.
pub mod lru;
/// The public facade tying the store and the loader together.
pub mod manager;
/// Pending request queue.
pub mod queue;
/// Cache traits for read and write operations.
pub mod traits;
