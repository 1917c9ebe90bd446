//! Domain errors for the configurator relay.

use std::net::SocketAddr;
use thiserror::Error;

/// Errors surfaced by the relay's resource layer.
///
/// The stores and the aggregator never fail; only IO does.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The listener could not be bound
    #[error("Failed to bind query server on {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying bind error
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an IO error
    #[error("Query server on {addr} failed: {source}")]
    Serve {
        /// Address that was bound
        addr: SocketAddr,
        /// Underlying serve error
        #[source]
        source: std::io::Error,
    },

    /// The server task panicked or was aborted
    #[error("Query server task panicked or was aborted: {0}")]
    ServerTask(String),

    /// `start` was called more than once
    #[error("Query server already started")]
    AlreadyStarted,

    /// `wait` was called without a running server
    #[error("Query server was not started")]
    NotStarted,

    /// Reading the event stream failed
    #[error("Failed to read event stream: {0}")]
    Input(#[from] std::io::Error),
}

/// Result alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
