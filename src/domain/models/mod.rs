//! Domain models.

pub mod config;
pub mod event;
pub mod record;

pub use config::{LoggingConfig, RelayConfig};
pub use event::{ItemResult, Outcome, RunEvent, RunSummary, TaskRef, TaskResult};
pub use record::{ItemRecord, StatsSnapshot, TaskRecord, TaskStatus};
