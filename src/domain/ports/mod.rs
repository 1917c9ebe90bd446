//! Ports implemented by the service layer.

pub mod event_sink;

pub use event_sink::EventSink;
