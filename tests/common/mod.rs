//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use configurator_relay::{
    Aggregator, EventStore, ItemResult, Outcome, QueryState, ShutdownSwitch, StatsStore,
    TaskRef, TaskResult,
};

pub struct Harness {
    pub events: Arc<EventStore>,
    pub stats: Arc<StatsStore>,
    pub switch: ShutdownSwitch,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            events: Arc::new(EventStore::new()),
            stats: Arc::new(StatsStore::new()),
            switch: ShutdownSwitch::new(),
        }
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.events.clone(), self.stats.clone())
    }

    pub fn state(&self) -> QueryState {
        QueryState {
            events: self.events.clone(),
            stats: self.stats.clone(),
            switch: self.switch.clone(),
        }
    }
}

pub fn task_result(name: &str, uuid: &str, outcome: Outcome, node: &str) -> TaskResult {
    TaskResult {
        task: TaskRef::new(name, uuid),
        outcome,
        changed: false,
        node: node.to_string(),
    }
}

pub fn item_result(name: &str, uuid: &str, item: &str, outcome: Outcome) -> ItemResult {
    ItemResult {
        task: TaskRef::new(name, uuid),
        item: item.to_string(),
        outcome,
        changed: false,
        node: "n1".to_string(),
    }
}
