//! Domain layer for the configurator relay
//!
//! Records, raw events, configuration models and the event sink port.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{RelayError, RelayResult};
