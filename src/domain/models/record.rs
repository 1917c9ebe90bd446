//! Aggregated run records.
//!
//! These are the shapes served over HTTP. Fields are declared in ascending
//! key order so the JSON output is sorted without a post-processing pass.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of a task, an item, or the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Completed without failure (skipped results count as ok)
    #[default]
    Ok,
    /// At least one contributing result failed
    Failed,
}

impl TaskStatus {
    /// Wire form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
        }
    }

    /// Combine with a newer outcome. `Failed` is sticky.
    #[must_use]
    pub fn escalate(self, other: Self) -> Self {
        match (self, other) {
            (Self::Ok, Self::Ok) => Self::Ok,
            _ => Self::Failed,
        }
    }

    /// `true` for [`TaskStatus::Ok`].
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One result for one loop item within a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Whether the node was modified
    pub changed: bool,
    /// Display key of the item
    pub name: String,
    /// Node the item ran on
    pub node: String,
    /// Outcome of this item
    pub status: TaskStatus,
}

/// One executed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Whether the last result modified its node
    pub changed: bool,
    /// Present only when the task looped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemRecord>>,
    /// Trimmed display name
    pub name: String,
    /// Node of the most recent result
    #[serde(default)]
    pub node: String,
    /// Escalated outcome of every contributing result
    #[serde(default)]
    pub status: TaskStatus,
    /// Stable identifier of the task definition
    pub uuid: String,
}

impl TaskRecord {
    /// Open a record for a task that has not reported any result yet.
    pub fn open(name: &str, uuid: impl Into<String>) -> Self {
        Self {
            changed: false,
            items: None,
            name: name.trim().to_string(),
            node: String::new(),
            status: TaskStatus::Ok,
            uuid: uuid.into(),
        }
    }

    /// Append an item result, creating the item list on first use.
    pub fn push_item(&mut self, item: ItemRecord) {
        self.items.get_or_insert_with(Vec::new).push(item);
    }

    /// Whether any item result was recorded.
    pub fn is_loop(&self) -> bool {
        self.items.is_some()
    }
}

/// End-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Elapsed seconds between aggregator construction and run end
    pub duration: f64,
    /// Per-node tally, sorted by node name
    pub stats: BTreeMap<String, Value>,
    /// `failed` when any result or item failed
    pub status: TaskStatus,
}
