//! HTTP adapters.

pub mod query_http;

pub use query_http::{PrettyJson, QueryHttpServer, QueryState};
