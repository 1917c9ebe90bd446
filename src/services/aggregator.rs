//! Aggregation state machine.
//!
//! Turns the ordered stream of orchestration callbacks into [`TaskRecord`]s
//! and the final [`StatsSnapshot`]. Owned and driven by the producer thread;
//! the only shared state it touches is the two stores.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::models::{
    ItemRecord, ItemResult, RunSummary, StatsSnapshot, TaskRecord, TaskRef, TaskResult,
    TaskStatus,
};
use crate::domain::ports::EventSink;
use crate::services::{EventStore, StatsStore};

/// Single-producer aggregator for one orchestration run.
#[derive(Debug)]
pub struct Aggregator {
    events: Arc<EventStore>,
    stats: Arc<StatsStore>,
    in_flight: Option<TaskRecord>,
    errors: u64,
    started: Instant,
    strict_items: bool,
    orphaned_items: u64,
}

impl Aggregator {
    /// Start aggregating. The run clock starts now.
    pub fn new(events: Arc<EventStore>, stats: Arc<StatsStore>) -> Self {
        Self {
            events,
            stats,
            in_flight: None,
            errors: 0,
            started: Instant::now(),
            strict_items: false,
            orphaned_items: 0,
        }
    }

    /// Drop item events that do not belong to the open task instead of
    /// attributing them to it.
    #[must_use]
    pub fn with_strict_items(mut self, strict: bool) -> Self {
        self.strict_items = strict;
        self
    }

    /// Number of non-ok results and items seen so far.
    pub fn error_count(&self) -> u64 {
        self.errors
    }

    /// Item events dropped in strict mode.
    pub fn orphaned_items(&self) -> u64 {
        self.orphaned_items
    }

    /// The record still being built, if any.
    pub fn in_flight(&self) -> Option<&TaskRecord> {
        self.in_flight.as_ref()
    }

    fn is_open(&self, uuid: &str) -> bool {
        self.in_flight.as_ref().is_some_and(|r| r.uuid == uuid)
    }

    fn tally(&mut self, status: TaskStatus) {
        if !status.is_ok() {
            self.errors += 1;
        }
    }

    fn finalize(&mut self) {
        if let Some(record) = self.in_flight.take() {
            debug!(
                uuid = %record.uuid,
                name = %record.name,
                status = %record.status,
                items = record.items.as_ref().map_or(0, Vec::len),
                "task finalized"
            );
            self.events.append(record);
        }
    }
}

impl EventSink for Aggregator {
    fn on_task_start(&mut self, task: &TaskRef) {
        self.finalize();
        self.in_flight = Some(TaskRecord::open(&task.name, task.uuid.clone()));
    }

    fn on_result(&mut self, result: &TaskResult) {
        if !self.is_open(&result.task.uuid) {
            self.on_task_start(&result.task);
        }

        let status = result.outcome.status();
        self.tally(status);

        if let Some(record) = self.in_flight.as_mut() {
            record.status = record.status.escalate(status);
            record.changed = result.changed;
            record.node.clone_from(&result.node);
        }
        self.finalize();
    }

    fn on_item_result(&mut self, result: &ItemResult) {
        let status = result.outcome.status();
        self.tally(status);

        if self.strict_items && !self.is_open(&result.task.uuid) {
            self.orphaned_items += 1;
            warn!(
                uuid = %result.task.uuid,
                item = %result.item,
                open = ?self.in_flight.as_ref().map(|r| r.uuid.as_str()),
                "dropping item result that does not match the open task"
            );
            return;
        }

        let Some(record) = self.in_flight.as_mut() else {
            debug!(uuid = %result.task.uuid, "item result with no open task ignored");
            return;
        };

        record.status = record.status.escalate(status);
        record.push_item(ItemRecord {
            changed: result.changed,
            name: result.item.clone(),
            node: result.node.clone(),
            status,
        });
    }

    fn on_run_end(&mut self, summary: &RunSummary) -> StatsSnapshot {
        self.finalize();

        let stats: BTreeMap<_, _> = summary
            .processed
            .iter()
            .map(|(node, tally)| (node.clone(), tally.clone()))
            .collect();

        let snapshot = StatsSnapshot {
            duration: self.started.elapsed().as_secs_f64(),
            stats,
            status: if self.errors == 0 {
                TaskStatus::Ok
            } else {
                TaskStatus::Failed
            },
        };

        info!(
            status = %snapshot.status,
            errors = self.errors,
            tasks = self.events.len(),
            duration_secs = snapshot.duration,
            "run ended"
        );
        self.stats.set(snapshot.clone());
        snapshot
    }

    /// Finalize the open record without publishing stats.
    fn finish(&mut self) {
        self.finalize();
    }
}
