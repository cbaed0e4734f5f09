//! Synchronization primitives.
//!
//! Shims between loom and std synchronization primitives.
pub mod atomic;

#[cfg(loom)]
pub use loom::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};

#[cfg(not(loom))]
pub use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
