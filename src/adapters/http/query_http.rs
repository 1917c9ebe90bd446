//! Query HTTP Server.
//!
//! Serves the aggregated run state to polling consumers:
//!
//! | Route       | Body                                              |
//! |-------------|---------------------------------------------------|
//! | `/tasks`    | records finalized since the previous `/tasks` call |
//! | `/results`  | every record finalized so far                     |
//! | `/stats`    | the final run summary, `{}` until the run ends    |
//! | `/shutdown` | stops the server once in-flight requests finish   |
//! | `/health`   | plain `OK`                                        |

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::application::lifecycle::ShutdownSwitch;
use crate::services::{EventStore, StatsStore};

/// JSON body pretty-printed with four-space indentation.
#[derive(Debug, Clone)]
pub struct PrettyJson<T>(pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        let mut buf = Vec::with_capacity(256);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);

        match self.0.serialize(&mut serializer) {
            Ok(()) => ([(header::CONTENT_TYPE, "application/json")], buf).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode response");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

/// Shared state for the query HTTP server.
#[derive(Debug, Clone)]
pub struct QueryState {
    /// Finalized task records
    pub events: Arc<EventStore>,
    /// Run summary, once published
    pub stats: Arc<StatsStore>,
    /// Tripped by `/shutdown`
    pub switch: ShutdownSwitch,
}

/// Query HTTP Server.
pub struct QueryHttpServer {
    state: QueryState,
}

impl QueryHttpServer {
    /// Create a server over shared state.
    pub fn new(state: QueryState) -> Self {
        Self { state }
    }

    /// Build the router with all endpoints.
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/tasks", get(latest_tasks))
            .route("/results", get(all_results))
            .route("/stats", get(run_stats))
            .route("/shutdown", get(shutdown))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn latest_tasks(State(state): State<QueryState>) -> impl IntoResponse {
    let delta = state.events.drain_delta();
    tracing::debug!(count = delta.len(), "serving task delta");
    PrettyJson(delta)
}

async fn all_results(State(state): State<QueryState>) -> impl IntoResponse {
    PrettyJson(state.events.snapshot_all())
}

async fn run_stats(State(state): State<QueryState>) -> Response {
    match state.stats.get() {
        Some(snapshot) => PrettyJson(snapshot).into_response(),
        None => PrettyJson(json!({})).into_response(),
    }
}

async fn shutdown(State(state): State<QueryState>) -> impl IntoResponse {
    if state.switch.stop() {
        tracing::info!("shutdown requested over HTTP");
    }
    PrettyJson(json!({ "status": "stopping" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_json_sets_content_type() {
        let response = PrettyJson(json!({"b": 1, "a": [true]})).into_response();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_pretty_json_body_layout() {
        let response = PrettyJson(json!({"b": 1, "a": 2})).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "{\n    \"a\": 2,\n    \"b\": 1\n}"
        );
    }
}
