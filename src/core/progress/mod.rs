//! Progress and status reporting
//!
//! Export streams publish status lines and progress fractions through a
//! [`ReporterHandle`]. Publishing never blocks and never fails: the events go
//! over an unbounded channel to a single [`StatusReporter`] task, which keeps
//! the ordered status log and forwards events to optional external sinks.

pub mod reporter;

pub use reporter::{ReporterHandle, StatusLog, StatusReporter};

/// Receiver of human-readable status lines
pub trait StatusSink: Send + Sync {
    fn report(&self, line: &str);
}

/// Receiver of per-stream progress fractions in `[0, 1]`
pub trait ProgressSink: Send + Sync {
    fn update(&self, stream: &str, fraction: f64);
}

/// Decides when a window's progress is worth publishing
///
/// An update is due once at least `interval` rows were processed since the
/// last one; [`ProgressTracker::complete`] always yields a final update, so
/// every window publishes at least once.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    interval: u64,
    processed: u64,
    last_published: u64,
}

impl ProgressTracker {
    pub fn new(total: u64, interval: usize) -> Self {
        Self {
            total,
            interval: interval.max(1) as u64,
            processed: 0,
            last_published: 0,
        }
    }

    /// Record one processed row; returns the fraction to publish, if due
    pub fn advance(&mut self) -> Option<f64> {
        self.processed += 1;
        if self.processed - self.last_published >= self.interval {
            self.last_published = self.processed;
            Some(self.fraction())
        } else {
            None
        }
    }

    /// Final fraction of the window
    pub fn complete(&mut self) -> f64 {
        self.last_published = self.processed;
        if self.total == 0 {
            1.0
        } else {
            self.fraction()
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.processed as f64 / self.total as f64).min(1.0)
    }
}
