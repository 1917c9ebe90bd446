//! Raw orchestration events.
//!
//! One `RunEvent` per callback the orchestration process emits. On the wire
//! each event is a JSON object tagged by `event`, one per line:
//!
//! ```text
//! {"event":"task_start","name":"install","uuid":"u1"}
//! {"event":"result","task":{"name":"install","uuid":"u1"},"outcome":"ok","changed":true,"node":"n1"}
//! {"event":"run_end","processed":{"n1":{"ok":1,"changed":1,"failures":0}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::record::TaskStatus;

/// Outcome reported by the orchestrator for a single result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Succeeded, possibly with changes
    Ok,
    /// Failed or the node was unreachable
    Failed,
    /// Not executed on this node
    Skipped,
}

impl Outcome {
    /// Skipped results are recorded as ok.
    pub fn status(self) -> TaskStatus {
        match self {
            Self::Ok | Self::Skipped => TaskStatus::Ok,
            Self::Failed => TaskStatus::Failed,
        }
    }
}

/// Identity of a task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    /// Display name, untrimmed
    pub name: String,
    /// Stable identifier of the task definition
    pub uuid: String,
}

impl TaskRef {
    /// Build a reference from a name and a uuid.
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }
}

/// Result of a non-looped task on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task the result belongs to
    pub task: TaskRef,
    /// Reported outcome
    pub outcome: Outcome,
    /// Whether the node was modified
    #[serde(default)]
    pub changed: bool,
    /// Node the task ran on
    pub node: String,
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    /// Looped task the item belongs to
    pub task: TaskRef,
    /// Display key of the loop item
    pub item: String,
    /// Reported outcome
    pub outcome: Outcome,
    /// Whether the node was modified
    #[serde(default)]
    pub changed: bool,
    /// Node the item ran on
    pub node: String,
}

/// Final per-node tallies, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tally per node name, opaque to the relay
    #[serde(default)]
    pub processed: HashMap<String, Value>,
}

/// Every callback the aggregator understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// A task is about to run
    TaskStart(TaskRef),
    /// A non-looped task finished
    Result(TaskResult),
    /// One loop iteration finished
    ItemResult(ItemResult),
    /// The run is over
    RunEnd(RunSummary),
}

impl RunEvent {
    /// Wire tag of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskStart(_) => "task_start",
            Self::Result(_) => "result",
            Self::ItemResult(_) => "item_result",
            Self::RunEnd(_) => "run_end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_counts_as_ok() {
        assert_eq!(Outcome::Skipped.status(), TaskStatus::Ok);
        assert_eq!(Outcome::Ok.status(), TaskStatus::Ok);
        assert_eq!(Outcome::Failed.status(), TaskStatus::Failed);
    }

    #[test]
    fn test_parse_tagged_events() {
        let start: RunEvent =
            serde_json::from_str(r#"{"event":"task_start","name":"install","uuid":"u1"}"#)
                .unwrap();
        assert_eq!(start, RunEvent::TaskStart(TaskRef::new("install", "u1")));

        let result: RunEvent = serde_json::from_str(
            r#"{"event":"result","task":{"name":"install","uuid":"u1"},"outcome":"skipped","node":"n1"}"#,
        )
        .unwrap();
        match result {
            RunEvent::Result(r) => {
                assert_eq!(r.outcome, Outcome::Skipped);
                assert!(!r.changed, "changed defaults to false");
            }
            other => panic!("Expected result event, got {other:?}"),
        }

        let end: RunEvent = serde_json::from_str(
            r#"{"event":"run_end","processed":{"n1":{"ok":3,"failures":0}}}"#,
        )
        .unwrap();
        assert_eq!(end.kind(), "run_end");
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let parsed = serde_json::from_str::<RunEvent>(r#"{"event":"play_start"}"#);
        assert!(parsed.is_err());
    }
}
