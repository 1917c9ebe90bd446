//! Stores and the aggregator.

pub mod aggregator;
pub mod event_store;
pub mod stats_store;

pub use aggregator::Aggregator;
pub use event_store::EventStore;
pub use stats_store::StatsStore;
