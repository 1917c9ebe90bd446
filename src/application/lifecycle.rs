//! Query server lifecycle.
//!
//! `NotStarted → Running → ShutdownScheduled → Stopped`. The server is
//! started when the job starts, scheduled to stop a grace period after the
//! run ends, and can be stopped immediately from `/shutdown` or Ctrl-C.
//! Whichever stop comes first wins; later ones are no-ops.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapters::http::{QueryHttpServer, QueryState};
use crate::domain::models::RelayConfig;
use crate::domain::{RelayError, RelayResult};
use crate::services::{EventStore, StatsStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lifecycle of the query server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, nothing bound yet
    NotStarted,
    /// Serving requests
    Running,
    /// Serving until the grace period elapses
    ShutdownScheduled,
    /// No longer serving
    Stopped,
}

/// Idempotent stop trigger shared with the HTTP handlers.
#[derive(Debug, Clone)]
pub struct ShutdownSwitch {
    state: Arc<Mutex<LifecycleState>>,
    token: CancellationToken,
}

impl Default for ShutdownSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSwitch {
    /// New switch in `NotStarted`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LifecycleState::NotStarted)),
            token: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    /// Move to `Stopped` and signal the server.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn stop(&self) -> bool {
        let previous = {
            let mut state = lock(&self.state);
            if *state == LifecycleState::Stopped {
                return false;
            }
            std::mem::replace(&mut *state, LifecycleState::Stopped)
        };
        self.token.cancel();
        info!(from = ?previous, "query server stopping");
        true
    }

    /// Resolves once `stop` has been called.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        let mut state = lock(&self.state);
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }
}

/// Where to listen and how long to linger after the run.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// `host:port` to bind
    pub bind_address: String,
    /// Delay between run end and stop
    pub grace_period: Duration,
}

impl From<&RelayConfig> for LifecycleConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            bind_address: config.bind_address(),
            grace_period: config.grace_period(),
        }
    }
}

/// Owns the query server task and its shutdown timer.
#[derive(Debug)]
pub struct LifecycleController {
    config: LifecycleConfig,
    events: Arc<EventStore>,
    stats: Arc<StatsStore>,
    switch: ShutdownSwitch,
    runtime: OnceLock<Handle>,
    local_addr: OnceLock<SocketAddr>,
    server: Mutex<Option<JoinHandle<RelayResult<()>>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleController {
    /// Controller in `NotStarted`; nothing is bound until [`Self::start`].
    pub fn new(config: LifecycleConfig, events: Arc<EventStore>, stats: Arc<StatsStore>) -> Self {
        Self {
            config,
            events,
            stats,
            switch: ShutdownSwitch::new(),
            runtime: OnceLock::new(),
            local_addr: OnceLock::new(),
            server: Mutex::new(None),
            timer: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.switch.state()
    }

    /// Handle for triggering a stop from elsewhere.
    pub fn switch(&self) -> ShutdownSwitch {
        self.switch.clone()
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Configured grace period.
    pub fn grace_period(&self) -> Duration {
        self.config.grace_period
    }

    /// Bind the listener and spawn the query server.
    ///
    /// A bind failure is fatal for the run: nothing could be served.
    pub async fn start(&self) -> RelayResult<SocketAddr> {
        if self.state() != LifecycleState::NotStarted {
            return Err(RelayError::AlreadyStarted);
        }

        let addr = self.config.bind_address.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| RelayError::Bind { addr, source })?;

        if !self
            .switch
            .transition(LifecycleState::NotStarted, LifecycleState::Running)
        {
            return Err(RelayError::AlreadyStarted);
        }
        let _ = self.runtime.set(Handle::current());
        let _ = self.local_addr.set(local);

        let server = QueryHttpServer::new(QueryState {
            events: self.events.clone(),
            stats: self.stats.clone(),
            switch: self.switch.clone(),
        });
        let shutdown = self.switch.token.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            server
                .serve(listener, shutdown)
                .await
                .map_err(|source| RelayError::Serve {
                    addr: local,
                    source,
                })
        });
        *lock(&self.server) = Some(task);

        info!(port = local.port(), "server started on port {}", local.port());
        Ok(local)
    }

    /// Arm the grace-period timer after the final stats are published.
    ///
    /// Safe to call from a non-async thread. Returns `false` when the server
    /// is not running or a shutdown is already scheduled.
    pub fn schedule_shutdown(&self) -> bool {
        let Some(runtime) = self.runtime.get() else {
            debug!("shutdown not scheduled: server never started");
            return false;
        };
        if !self
            .switch
            .transition(LifecycleState::Running, LifecycleState::ShutdownScheduled)
        {
            debug!(state = ?self.state(), "shutdown not scheduled");
            return false;
        }

        let grace = self.config.grace_period;
        info!(
            grace_secs = grace.as_secs_f64(),
            "shutting down configurator server in {} seconds",
            grace.as_secs()
        );

        let switch = self.switch.clone();
        let timer = runtime.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(grace) => {
                    if switch.stop() {
                        info!("grace period elapsed");
                    }
                }
                () = switch.stopped() => {
                    debug!("scheduled shutdown superseded by an earlier stop");
                }
            }
        });
        *lock(&self.timer) = Some(timer);
        true
    }

    /// Stop serving now. Idempotent.
    pub fn stop(&self) -> bool {
        self.switch.stop()
    }

    /// Wait for the server task to finish.
    pub async fn wait(&self) -> RelayResult<()> {
        let task = lock(&self.server).take().ok_or(RelayError::NotStarted)?;
        let result = task
            .await
            .map_err(|e| RelayError::ServerTask(e.to_string()))?;

        // A serve error ends the task without a stop; settle the state.
        self.switch.stop();
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(grace: Duration) -> LifecycleController {
        LifecycleController::new(
            LifecycleConfig {
                bind_address: "127.0.0.1:0".to_string(),
                grace_period: grace,
            },
            Arc::new(EventStore::new()),
            Arc::new(StatsStore::new()),
        )
    }

    #[test]
    fn test_switch_stop_is_idempotent() {
        let switch = ShutdownSwitch::new();
        assert_eq!(switch.state(), LifecycleState::NotStarted);
        assert!(switch.stop());
        assert!(!switch.stop());
        assert_eq!(switch.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_schedule_before_start_is_rejected() {
        let lifecycle = controller(Duration::from_secs(1));
        assert!(!lifecycle.schedule_shutdown());
        assert_eq!(lifecycle.state(), LifecycleState::NotStarted);
    }

    #[tokio::test]
    async fn test_start_transitions_to_running() {
        let lifecycle = controller(Duration::from_secs(60));
        let addr = lifecycle.start().await.unwrap();

        assert_ne!(addr.port(), 0);
        assert_eq!(lifecycle.local_addr(), Some(addr));
        assert_eq!(lifecycle.state(), LifecycleState::Running);

        assert!(lifecycle.stop());
        lifecycle.wait().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let lifecycle = controller(Duration::from_secs(60));
        lifecycle.start().await.unwrap();
        assert!(matches!(
            lifecycle.start().await,
            Err(RelayError::AlreadyStarted)
        ));
        lifecycle.stop();
        lifecycle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken = holder.local_addr().unwrap();

        let lifecycle = LifecycleController::new(
            LifecycleConfig {
                bind_address: taken.to_string(),
                grace_period: Duration::from_secs(1),
            },
            Arc::new(EventStore::new()),
            Arc::new(StatsStore::new()),
        );

        let err = lifecycle.start().await.unwrap_err();
        assert!(matches!(err, RelayError::Bind { .. }));
        assert_eq!(lifecycle.state(), LifecycleState::NotStarted);
    }

    #[tokio::test]
    async fn test_scheduled_shutdown_stops_after_grace_period() {
        let lifecycle = controller(Duration::from_millis(50));
        lifecycle.start().await.unwrap();

        assert!(lifecycle.schedule_shutdown());
        assert_eq!(lifecycle.state(), LifecycleState::ShutdownScheduled);
        assert!(!lifecycle.schedule_shutdown(), "only one timer per run");

        tokio::time::timeout(Duration::from_secs(5), lifecycle.wait())
            .await
            .expect("server should stop after the grace period")
            .unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_manual_stop_supersedes_timer() {
        let lifecycle = controller(Duration::from_secs(3600));
        lifecycle.start().await.unwrap();
        lifecycle.schedule_shutdown();

        assert!(lifecycle.stop());
        tokio::time::timeout(Duration::from_secs(5), lifecycle.wait())
            .await
            .expect("manual stop should not wait for the timer")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_stops_transition_once() {
        let lifecycle = controller(Duration::from_secs(60));
        lifecycle.start().await.unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let switch = lifecycle.switch();
                std::thread::spawn(move || switch.stop())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        lifecycle.wait().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }
}
