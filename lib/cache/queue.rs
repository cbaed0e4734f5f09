//! FIFO of pending load requests shared between producers and the single loader.

use std::collections::VecDeque;
use std::sync::PoisonError;

use crate::sync::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<String>,
    shutdown: bool,
}

/// An unbounded, multi-producer single-consumer request queue.
///
/// Producers append with [`RequestQueue::push`], which only holds the lock long enough to append.
/// The consumer parks in [`RequestQueue::pop`] on a condition variable until a request arrives or
/// [`RequestQueue::shutdown`] is called. Duplicates are kept; ordering is strictly FIFO.
#[derive(Debug)]
pub struct RequestQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    /// Create an empty, running queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a request and wake the consumer.
    pub fn push(&self, key: String) {
        self.lock().pending.push_back(key);
        self.ready.notify_one();
    }

    /// Block until a request is available and return the oldest one.
    ///
    /// Returns `None` once the queue has been shut down. Requests still pending at that point are
    /// abandoned rather than drained.
    pub fn pop(&self) -> Option<String> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(key) = state.pending.pop_front() {
                return Some(key);
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Return the oldest request without blocking, if any.
    #[must_use]
    pub fn try_pop(&self) -> Option<String> {
        let mut state = self.lock();
        if state.shutdown {
            return None;
        }
        state.pending.pop_front()
    }

    /// Raise the shutdown signal and wake every waiter.
    pub fn shutdown(&self) {
        self.lock().shutdown = true;
        self.ready.notify_all();
    }

    /// Whether [`RequestQueue::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.lock().shutdown
    }

    /// Pending requests, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Whether no requests are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}
