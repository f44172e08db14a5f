//! Single-writer status reporter task

use super::{ProgressSink, StatusSink};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug)]
enum Event {
    Status(String),
    Progress { stream: String, fraction: f64 },
    Shutdown,
}

/// Everything the reporter received, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLog {
    /// Status lines in the order they were published
    pub lines: Vec<String>,

    /// Last progress fraction published per stream
    pub progress: BTreeMap<String, f64>,
}

impl StatusLog {
    /// Whether any status line equals `line`
    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }
}

/// Cloneable publishing side of the reporter
///
/// A detached handle, or one whose reporter has finished, silently drops
/// everything it is given.
#[derive(Debug, Clone, Default)]
pub struct ReporterHandle {
    tx: Option<UnboundedSender<Event>>,
}

impl ReporterHandle {
    /// Handle not connected to any reporter
    pub fn detached() -> Self {
        Self::default()
    }

    /// Publish a status line
    pub fn status(&self, line: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Event::Status(line.into()));
        }
    }

    /// Publish the progress of a stream
    pub fn progress(&self, stream: &str, fraction: f64) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Event::Progress {
                stream: stream.to_string(),
                fraction,
            });
        }
    }
}

/// Owner of the reporter task
pub struct StatusReporter {
    tx: UnboundedSender<Event>,
    task: JoinHandle<StatusLog>,
}

impl StatusReporter {
    /// Spawn a reporter that only records the log
    pub fn spawn() -> Self {
        Self::spawn_with_sinks(None, None)
    }

    /// Spawn a reporter that also forwards events to external sinks
    pub fn spawn_with_sinks(
        status_sink: Option<Arc<dyn StatusSink>>,
        progress_sink: Option<Arc<dyn ProgressSink>>,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        let task = tokio::spawn(run(rx, status_sink, progress_sink));
        Self { tx, task }
    }

    /// New publishing handle
    pub fn handle(&self) -> ReporterHandle {
        ReporterHandle {
            tx: Some(self.tx.clone()),
        }
    }

    /// Stop the task once every event published so far is processed
    pub async fn finish(self) -> StatusLog {
        let _ = self.tx.send(Event::Shutdown);
        match self.task.await {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(error = %e, "Status reporter task failed");
                StatusLog::default()
            }
        }
    }
}

async fn run(
    mut rx: UnboundedReceiver<Event>,
    status_sink: Option<Arc<dyn StatusSink>>,
    progress_sink: Option<Arc<dyn ProgressSink>>,
) -> StatusLog {
    let mut log = StatusLog::default();

    while let Some(event) = rx.recv().await {
        match event {
            Event::Status(line) => {
                tracing::info!(status = %line, "Status");
                if let Some(sink) = &status_sink {
                    sink.report(&line);
                }
                log.lines.push(line);
            }
            Event::Progress { stream, fraction } => {
                tracing::debug!(stream = %stream, fraction, "Progress");
                if let Some(sink) = &progress_sink {
                    sink.update(&stream, fraction);
                }
                log.progress.insert(stream, fraction);
            }
            Event::Shutdown => break,
        }
    }

    log
}
