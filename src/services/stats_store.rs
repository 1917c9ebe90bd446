//! Single-slot holder for the run summary.

use std::sync::{PoisonError, RwLock};

use crate::domain::models::StatsSnapshot;

/// Latest [`StatsSnapshot`], independent of the event store's lock.
#[derive(Debug, Default)]
pub struct StatsStore {
    current: RwLock<Option<StatsSnapshot>>,
}

impl StatsStore {
    /// Store with no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot.
    pub fn set(&self, snapshot: StatsSnapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// `None` until the run has ended.
    pub fn get(&self) -> Option<StatsSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
