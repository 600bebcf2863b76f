//! Work distribution
//!
//! [`WorkQueue`] hands out pending patient identifiers, one per request, to
//! any number of concurrent workers. Check-and-remove happens under a single
//! lock, so no id is ever handed to two workers and the last id cannot be
//! skipped. A taken id is never returned to the queue.

use crate::domain::PatientId;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe FIFO of patient identifiers
#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: Mutex<VecDeque<PatientId>>,
}

impl WorkQueue {
    /// Create a queue seeded with `ids`, in order
    pub fn new(ids: impl IntoIterator<Item = PatientId>) -> Self {
        Self {
            pending: Mutex::new(ids.into_iter().collect()),
        }
    }

    /// Take the next identifier
    ///
    /// Returns `None` once the queue is exhausted; that is a normal
    /// termination signal for workers, not an error.
    pub fn take(&self) -> Option<PatientId> {
        self.lock().pop_front()
    }

    /// Snapshot of the identifiers not yet taken, in queue order
    pub fn remaining(&self) -> Vec<PatientId> {
        self.lock().iter().copied().collect()
    }

    /// Number of identifiers not yet taken
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether every identifier has been taken
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PatientId>> {
        // A worker panicking while holding the lock cannot leave the deque
        // half-modified: every critical section is a single deque call.
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
