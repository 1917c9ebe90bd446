//! Event sink port.
//!
//! The orchestration hook calls into this trait, one method per callback
//! kind. Implementations are driven by a single producer thread.

use crate::domain::models::{ItemResult, RunEvent, RunSummary, StatsSnapshot, TaskRef, TaskResult};

/// Consumer of orchestration callbacks.
pub trait EventSink {
    /// A task is about to run.
    fn on_task_start(&mut self, task: &TaskRef);

    /// A non-looped task produced its result.
    fn on_result(&mut self, result: &TaskResult);

    /// One iteration of a looped task produced its result.
    fn on_item_result(&mut self, result: &ItemResult);

    /// The run finished. Returns the published snapshot.
    fn on_run_end(&mut self, summary: &RunSummary) -> StatsSnapshot;

    /// The event stream ended without a run summary.
    fn finish(&mut self) {}

    /// Route a decoded event to the matching hook.
    ///
    /// Returns the snapshot when the event ended the run.
    fn dispatch(&mut self, event: &RunEvent) -> Option<StatsSnapshot> {
        match event {
            RunEvent::TaskStart(task) => self.on_task_start(task),
            RunEvent::Result(result) => self.on_result(result),
            RunEvent::ItemResult(result) => self.on_item_result(result),
            RunEvent::RunEnd(summary) => return Some(self.on_run_end(summary)),
        }
        None
    }
}
