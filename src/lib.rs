//! Configurator Relay - embedded aggregation server for orchestration runs
//!
//! An orchestration job emits a stream of callbacks (task starts, results,
//! loop item results, final stats). The relay folds them into task records
//! and serves the accumulated state over HTTP to polling consumers, then
//! shuts itself down a grace period after the run ends.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): records, raw events, the event sink port
//! - **Service Layer** (`services`): the stores and the aggregator
//! - **Application Layer** (`application`): producer loop and server lifecycle
//! - **Adapters** (`adapters`): the HTTP query surface
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use configurator_relay::{Aggregator, EventSink, EventStore, StatsStore, TaskRef};
//!
//! let events = Arc::new(EventStore::new());
//! let stats = Arc::new(StatsStore::new());
//! let mut aggregator = Aggregator::new(events.clone(), stats.clone());
//! aggregator.on_task_start(&TaskRef::new("install", "u1"));
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::http::{QueryHttpServer, QueryState};
pub use application::{
    EventFeed, FeedReport, LifecycleConfig, LifecycleController, LifecycleState, ShutdownSwitch,
};
pub use domain::models::{
    ItemRecord, ItemResult, LoggingConfig, Outcome, RelayConfig, RunEvent, RunSummary,
    StatsSnapshot, TaskRecord, TaskRef, TaskResult, TaskStatus,
};
pub use domain::ports::EventSink;
pub use domain::{RelayError, RelayResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Aggregator, EventStore, StatsStore};
