//! Append-only store of finalized task records.
//!
//! Holds the permanent log and the delta buffer behind one lock. Records
//! only enter the store once the aggregator is done mutating them.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::models::TaskRecord;

#[derive(Debug, Default)]
struct Inner {
    all: Vec<TaskRecord>,
    pending: Vec<TaskRecord>,
}

/// Thread-safe log of finalized task records.
#[derive(Debug, Default)]
pub struct EventStore {
    inner: Mutex<Inner>,
}

impl EventStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections are plain Vec operations, so a poisoned lock still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a record to the permanent log and the delta buffer.
    pub fn append(&self, record: TaskRecord) {
        let mut inner = self.lock();
        inner.pending.push(record.clone());
        inner.all.push(record);
    }

    /// Take everything appended since the previous drain.
    ///
    /// The buffer is shared: concurrent callers split the pending records.
    pub fn drain_delta(&self) -> Vec<TaskRecord> {
        std::mem::take(&mut self.lock().pending)
    }

    /// Copy of the permanent log in append order.
    pub fn snapshot_all(&self) -> Vec<TaskRecord> {
        self.lock().all.clone()
    }

    /// Number of records in the permanent log.
    pub fn len(&self) -> usize {
        self.lock().all.len()
    }

    /// Whether nothing has been finalized yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
