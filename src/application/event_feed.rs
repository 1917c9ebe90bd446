//! Producer loop.
//!
//! Reads one JSON [`RunEvent`] per line and drives the aggregator
//! synchronously. Meant to run on a blocking thread: every call completes
//! without yielding, and nothing here waits on the query server.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::lifecycle::LifecycleController;
use crate::domain::models::{RunEvent, StatsSnapshot};
use crate::domain::ports::EventSink;
use crate::domain::RelayResult;

/// What a feed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Events decoded and applied
    pub events: u64,
    /// Blank or undecodable lines
    pub skipped_lines: u64,
    /// Whether a `run_end` event was seen
    pub run_ended: bool,
}

/// Drives an [`EventSink`] from a line-oriented event stream.
pub struct EventFeed<S, W> {
    sink: S,
    stats_out: W,
    lifecycle: Option<Arc<LifecycleController>>,
}

impl<S: EventSink, W: Write> EventFeed<S, W> {
    /// `stats_out` receives the final snapshot as a single JSON line.
    pub fn new(sink: S, stats_out: W) -> Self {
        Self {
            sink,
            stats_out,
            lifecycle: None,
        }
    }

    /// Schedule the server shutdown once the stream is exhausted.
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Arc<LifecycleController>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// The sink being driven.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume `input` until EOF or the first `run_end` event.
    ///
    /// The open record is finalized on every exit path, including a read
    /// error. Shutdown is only scheduled when the stream was read cleanly.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> RelayResult<FeedReport> {
        let mut report = FeedReport::default();
        let read = self.consume(&mut input, &mut report);

        if !report.run_ended {
            warn!(
                events = report.events,
                "event stream ended without a run summary"
            );
            self.sink.finish();
        }
        read?;

        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.schedule_shutdown();
        }

        info!(
            events = report.events,
            skipped = report.skipped_lines,
            run_ended = report.run_ended,
            "event feed finished"
        );
        Ok(report)
    }

    fn consume<R: BufRead>(&mut self, input: &mut R, report: &mut FeedReport) -> RelayResult<()> {
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            line_no += 1;

            let Ok(text) = std::str::from_utf8(&buf) else {
                report.skipped_lines += 1;
                warn!(line = line_no, "skipping line that is not valid UTF-8");
                continue;
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                report.skipped_lines += 1;
                continue;
            }

            let event: RunEvent = match serde_json::from_str(trimmed) {
                Ok(event) => event,
                Err(err) => {
                    report.skipped_lines += 1;
                    warn!(line = line_no, error = %err, "skipping malformed event");
                    continue;
                }
            };

            debug!(line = line_no, kind = event.kind(), "applying event");
            report.events += 1;

            if let Some(snapshot) = self.sink.dispatch(&event) {
                report.run_ended = true;
                self.emit_stats(&snapshot);
                return Ok(());
            }
        }
    }

    fn emit_stats(&mut self, snapshot: &StatsSnapshot) {
        if let Err(err) = write_stats_line(&mut self.stats_out, snapshot) {
            warn!(error = %err, "failed to write final stats");
        }
    }
}

fn write_stats_line<W: Write>(out: &mut W, snapshot: &StatsSnapshot) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, snapshot)?;
    writeln!(out)?;
    out.flush()
}
