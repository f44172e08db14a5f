//! Chunked export driver
//!
//! Exports one stream (one source of one kind, or every source when the export
//! is unsegmented) a calendar month at a time. The loop is:
//!
//! 1. stop if a shutdown was signalled
//! 2. count the window's samples, then stream them in batches of
//!    `batch_size` into a temporary artifact
//! 3. commit the artifact (skipped for empty windows and dry runs)
//! 4. advance to the next month while the window lies in the past
//!
//! Store failures that outlast the retry policy end the stream. A failed
//! commit skips its window and freezes the stream's watermark so the next
//! incremental run starts over from the last good window.

use super::clock::Clock;
use super::retry::RetryPolicy;
use super::summary::{ExportError, ExportErrorType, ExportedArtifact, StreamReport, StreamStatus};
use super::window::{bootstrap_window, find_earliest_sample, ExportWindow};
use crate::adapters::output::{ArtifactWriter, CommittedArtifact};
use crate::adapters::store::{QueryLimit, SampleQuery, SampleStore};
use crate::config::{ExportMode, OutputEncoding};
use crate::core::progress::{ProgressTracker, ReporterHandle};
use crate::core::serialize::RecordSerializer;
use crate::core::state::{StateManager, Watermark, ALL_SOURCES};
use crate::domain::{PulseError, SampleKind, Source};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Per-stream export settings
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub output_dir: PathBuf,
    pub encoding: OutputEncoding,
    pub batch_size: usize,
    pub progress_interval: usize,
    pub mode: ExportMode,
    pub dry_run: bool,
}

/// Everything a stream needs, shared by all streams of one kind
#[derive(Clone)]
pub struct DriverContext {
    pub store: Arc<dyn SampleStore>,
    pub kind: SampleKind,
    pub settings: StreamSettings,
    pub retry: RetryPolicy,
    pub clock: Arc<dyn Clock>,
    pub reporter: ReporterHandle,
    /// Watermark persistence; `None` when state is disabled
    pub state: Option<Arc<StateManager>>,
    pub shutdown: watch::Receiver<bool>,
}

impl DriverContext {
    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Result of one window
struct WindowOutcome {
    rows: u64,
    skipped: u64,
    artifact: Option<CommittedArtifact>,
}

enum WindowFailure {
    Store(PulseError),
    Persistence(PulseError),
    Interrupted,
}

/// Export one stream until its window passes the present
///
/// Never returns an error: failures are recorded in the report and, where
/// they end the stream, reflected in its status.
pub async fn export_stream(ctx: &DriverContext, source: Option<Source>) -> StreamReport {
    let kind = ctx.kind;
    let stream = source
        .as_ref()
        .map(Source::key)
        .unwrap_or_else(|| ALL_SOURCES.to_string());
    let label = source
        .as_ref()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "all sources".to_string());
    let progress_key = format!("{}:{}", kind.as_str(), stream);
    let mut report = StreamReport::new(kind, stream.clone(), source.clone());

    let mut watermark = load_watermark(ctx, &stream, &mut report).await;

    let resume_at = match ctx.settings.mode {
        ExportMode::Incremental => watermark.as_ref().and_then(|w| w.last_window_start),
        ExportMode::Full => None,
    };

    let first = match resume_at {
        Some(start) => {
            tracing::info!(
                kind = %kind,
                stream = %stream,
                resume_at = %start,
                "Resuming from watermark"
            );
            ExportWindow::starting_at(source.clone(), start)
        }
        None => {
            let earliest = ctx
                .retry
                .run("find_earliest_sample", || {
                    find_earliest_sample(ctx.store.as_ref(), kind, source.as_ref())
                })
                .await;
            match earliest {
                Ok(Some(sample)) => bootstrap_window(source.clone(), &sample),
                Ok(None) => {
                    ctx.reporter.status(match &source {
                        Some(s) => format!("No {kind} samples found for source {}", s.name),
                        None => format!("No {kind} samples found"),
                    });
                    report.status = StreamStatus::NoSamples;
                    return report;
                }
                Err(e) => {
                    abort_stream(ctx, &mut report, &label, &e, None);
                    return report;
                }
            }
        }
    };

    let mut window = match first {
        Ok(window) => window,
        Err(e) => {
            abort_stream(ctx, &mut report, &label, &e, None);
            return report;
        }
    };

    if let Some(w) = watermark.as_mut() {
        w.mark_started(ctx.clock.now());
        save_watermark(ctx, w, &mut report).await;
    }

    let mut watermark_frozen = false;

    loop {
        if ctx.is_shutdown() {
            interrupt_stream(ctx, &mut report, &label);
            break;
        }

        match export_window(ctx, &window, &progress_key).await {
            Ok(outcome) => {
                report.windows_processed += 1;
                report.rows_exported += outcome.rows;
                if outcome.skipped > 0 {
                    report.errors.push(
                        ExportError::new(
                            ExportErrorType::Serialization,
                            format!(
                                "skipped {} samples that could not be serialized",
                                outcome.skipped
                            ),
                        )
                        .with_context(window_context(&stream, &window)),
                    );
                }
                if let Some(committed) = outcome.artifact {
                    report.artifacts.push(ExportedArtifact {
                        kind,
                        stream: stream.clone(),
                        window_start: window.start,
                        window_end: window.end,
                        path: committed.path,
                        rows: committed.rows,
                        bytes: committed.bytes,
                        checksum: committed.checksum,
                    });
                }
                if !watermark_frozen {
                    if let Some(w) = watermark.as_mut() {
                        w.record_window(window.start, outcome.rows);
                        checkpoint(ctx, w, &mut report).await;
                    }
                }
            }
            Err(WindowFailure::Persistence(e)) => {
                report.windows_processed += 1;
                tracing::error!(
                    kind = %kind,
                    stream = %stream,
                    window = %window.describe(),
                    error = %e,
                    "Failed to persist window"
                );
                ctx.reporter
                    .status(format!("Error writing {}: {}", window.file_name(kind), e));
                report.errors.push(
                    ExportError::from_error(&e).with_context(window_context(&stream, &window)),
                );
                watermark_frozen = true;
            }
            Err(WindowFailure::Store(e)) => {
                abort_stream(ctx, &mut report, &label, &e, Some(&window));
                break;
            }
            Err(WindowFailure::Interrupted) => {
                interrupt_stream(ctx, &mut report, &label);
                break;
            }
        }

        if !window.is_closed_at(ctx.clock.now()) {
            ctx.reporter.status(format!("Done exporting from {label}"));
            report.status = StreamStatus::Completed;
            break;
        }

        window = match window.next() {
            Ok(next) => next,
            Err(e) => {
                abort_stream(ctx, &mut report, &label, &e, Some(&window));
                break;
            }
        };
    }

    if let Some(w) = watermark.as_mut() {
        let now = ctx.clock.now();
        match report.status {
            StreamStatus::Completed if !watermark_frozen => w.mark_completed(now),
            StreamStatus::Interrupted => w.mark_interrupted(now),
            _ => w.mark_failed(now),
        }
        save_watermark(ctx, w, &mut report).await;
    }

    tracing::info!(
        kind = %kind,
        stream = %stream,
        status = ?report.status,
        windows = report.windows_processed,
        rows = report.rows_exported,
        artifacts = report.artifacts.len(),
        "Stream finished"
    );

    report
}

async fn export_window(
    ctx: &DriverContext,
    window: &ExportWindow,
    progress_key: &str,
) -> std::result::Result<WindowOutcome, WindowFailure> {
    let kind = ctx.kind;
    let store = ctx.store.as_ref();
    let predicate = window.predicate();
    let range = window.describe();

    ctx.reporter.status(format!("Querying {range}..."));
    let total = ctx
        .retry
        .run("count", || store.count(kind, &predicate))
        .await
        .map_err(WindowFailure::Store)?;
    ctx.reporter.status(format!("Parsing {total} {kind} samples..."));

    let mut tracker = ProgressTracker::new(total, ctx.settings.progress_interval);
    if total == 0 {
        ctx.reporter.status(format!("No {kind} samples found in {range}"));
        ctx.reporter.progress(progress_key, tracker.complete());
        return Ok(WindowOutcome {
            rows: 0,
            skipped: 0,
            artifact: None,
        });
    }

    let serializer = RecordSerializer::new(kind);
    let file_name = window.file_name(kind);
    let mut writer = if ctx.settings.dry_run {
        None
    } else {
        let mut writer =
            ArtifactWriter::create(&ctx.settings.output_dir, &file_name, ctx.settings.encoding)
                .await
                .map_err(WindowFailure::Persistence)?;
        writer
            .write_header(&serializer.header())
            .await
            .map_err(WindowFailure::Persistence)?;
        Some(writer)
    };

    let batch_size = ctx.settings.batch_size.max(1);
    let mut offset = 0;
    let mut rows: u64 = 0;
    let mut skipped: u64 = 0;

    loop {
        if ctx.is_shutdown() {
            return Err(WindowFailure::Interrupted);
        }

        let query = SampleQuery::new(predicate.clone())
            .limit(QueryLimit::At(batch_size))
            .offset(offset);
        let batch = ctx
            .retry
            .run("query", || store.query(kind, &query))
            .await
            .map_err(WindowFailure::Store)?;
        let fetched = batch.len();

        for sample in &batch {
            match serializer.serialize(sample) {
                Ok(line) => {
                    if let Some(writer) = writer.as_mut() {
                        writer
                            .write_row(&line)
                            .await
                            .map_err(WindowFailure::Persistence)?;
                    }
                    rows += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        kind = %kind,
                        end_time = %sample.end_time,
                        error = %e,
                        "Skipping sample that could not be serialized"
                    );
                    skipped += 1;
                }
            }
            if let Some(fraction) = tracker.advance() {
                ctx.reporter.progress(progress_key, fraction);
            }
        }

        offset += fetched;
        if fetched < batch_size {
            break;
        }
    }

    ctx.reporter.progress(progress_key, tracker.complete());

    if rows == 0 {
        if let Some(writer) = writer {
            writer.abort().await;
        }
        ctx.reporter.status(format!("No {kind} samples found in {range}"));
        return Ok(WindowOutcome {
            rows,
            skipped,
            artifact: None,
        });
    }

    let artifact = match writer {
        Some(writer) => {
            ctx.reporter.status(format!("Writing {file_name}..."));
            Some(writer.commit().await.map_err(WindowFailure::Persistence)?)
        }
        None => {
            ctx.reporter
                .status(format!("Dry run: would write {file_name} ({rows} rows)"));
            None
        }
    };

    Ok(WindowOutcome {
        rows,
        skipped,
        artifact,
    })
}

fn window_context(stream: &str, window: &ExportWindow) -> String {
    format!("stream={} window={}", stream, window.describe())
}

fn abort_stream(
    ctx: &DriverContext,
    report: &mut StreamReport,
    label: &str,
    error: &PulseError,
    window: Option<&ExportWindow>,
) {
    // Store errors after a shutdown request count as an interruption
    if ctx.is_shutdown() {
        interrupt_stream(ctx, report, label);
        return;
    }

    tracing::error!(
        kind = %ctx.kind,
        stream = %report.stream,
        error = %error,
        "Stream aborted"
    );
    ctx.reporter
        .status(format!("Error exporting from {label}: {error}"));

    let context = match window {
        Some(window) => window_context(&report.stream, window),
        None => format!("stream={}", report.stream),
    };
    report
        .errors
        .push(ExportError::from_error(error).with_context(context));
    report.status = StreamStatus::Aborted;
}

fn interrupt_stream(ctx: &DriverContext, report: &mut StreamReport, label: &str) {
    tracing::warn!(kind = %ctx.kind, stream = %report.stream, "Stream interrupted");
    ctx.reporter.status(format!("Export from {label} interrupted"));
    report.status = StreamStatus::Interrupted;
}

async fn load_watermark(
    ctx: &DriverContext,
    stream: &str,
    report: &mut StreamReport,
) -> Option<Watermark> {
    let state = ctx.state.as_ref()?;
    match state.load_or_new(ctx.kind, stream).await {
        Ok(watermark) => Some(watermark),
        Err(e) => {
            tracing::warn!(stream = %stream, error = %e, "Failed to load watermark");
            report
                .errors
                .push(ExportError::from_error(&e).with_context(format!("stream={stream}")));
            None
        }
    }
}

async fn save_watermark(ctx: &DriverContext, watermark: &Watermark, report: &mut StreamReport) {
    if let Some(state) = &ctx.state {
        if let Err(e) = state.save_watermark(watermark).await {
            tracing::warn!(id = %watermark.id, error = %e, "Failed to save watermark");
            report.errors.push(
                ExportError::from_error(&e).with_context(format!("watermark={}", watermark.id)),
            );
        }
    }
}

async fn checkpoint(ctx: &DriverContext, watermark: &Watermark, report: &mut StreamReport) {
    if let Some(state) = &ctx.state {
        if let Err(e) = state.checkpoint_window(watermark).await {
            tracing::warn!(id = %watermark.id, error = %e, "Failed to checkpoint window");
            report.errors.push(
                ExportError::from_error(&e).with_context(format!("watermark={}", watermark.id)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::InMemorySampleStore;
    use crate::core::export::clock::FixedClock;
    use crate::core::progress::StatusReporter;
    use crate::core::state::FileStateStorage;
    use crate::domain::{BundleId, Quantity, Sample, Unit};
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn watch_source() -> Source {
        Source::new("Watch", BundleId::new("com.example.watch").unwrap())
    }

    fn sample(end: DateTime<Utc>, bpm: f64) -> Sample {
        Sample::builder()
            .kind(SampleKind::HeartRate)
            .quantity(Quantity::new(bpm, Unit::CountPerMinute))
            .start_time(end - chrono::Duration::minutes(1))
            .end_time(end)
            .source(watch_source())
            .build()
            .unwrap()
    }

    fn context(
        store: InMemorySampleStore,
        dir: &TempDir,
        now: DateTime<Utc>,
        reporter: ReporterHandle,
    ) -> (DriverContext, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let ctx = DriverContext {
            store: Arc::new(store),
            kind: SampleKind::HeartRate,
            settings: StreamSettings {
                output_dir: dir.path().to_path_buf(),
                encoding: OutputEncoding::Utf8,
                batch_size: 2,
                progress_interval: 100,
                mode: ExportMode::Full,
                dry_run: false,
            },
            retry: RetryPolicy::none(),
            clock: Arc::new(FixedClock(now)),
            reporter,
            state: None,
            shutdown: rx,
        };
        (ctx, tx)
    }

    #[tokio::test]
    async fn test_exports_each_month_with_samples() {
        let dir = TempDir::new().unwrap();
        let store = InMemorySampleStore::with_samples([
            sample(utc(2020, 1, 15, 10), 70.0),
            sample(utc(2020, 1, 20, 10), 71.0),
            sample(utc(2020, 1, 25, 10), 72.0),
            sample(utc(2020, 3, 2, 10), 73.0),
        ]);
        let reporter = StatusReporter::spawn();
        let (ctx, _tx) = context(store, &dir, utc(2020, 3, 15, 0), reporter.handle());

        let report = export_stream(&ctx, Some(watch_source())).await;
        let log = reporter.finish().await;

        assert_eq!(report.status, StreamStatus::Completed);
        assert_eq!(report.windows_processed, 3);
        assert_eq!(report.rows_exported, 4);
        assert_eq!(report.artifacts.len(), 2);
        assert!(dir
            .path()
            .join("Watch-com.example.watch-heartrate-2020-01.tsv")
            .exists());
        assert!(!dir
            .path()
            .join("Watch-com.example.watch-heartrate-2020-02.tsv")
            .exists());
        assert!(log.contains("No heart rate samples found in 02/01/2020 - 03/01/2020"));
        assert!(log.contains("Done exporting from Watch"));
        assert_eq!(log.progress.get("heart_rate:com.example.watch"), Some(&1.0));
    }

    #[tokio::test]
    async fn test_source_without_samples() {
        let dir = TempDir::new().unwrap();
        let reporter = StatusReporter::spawn();
        let (ctx, _tx) = context(
            InMemorySampleStore::new(),
            &dir,
            utc(2020, 3, 15, 0),
            reporter.handle(),
        );

        let report = export_stream(&ctx, Some(watch_source())).await;
        let log = reporter.finish().await;

        assert_eq!(report.status, StreamStatus::NoSamples);
        assert!(log.contains("No heart rate samples found for source Watch"));
    }

    #[tokio::test]
    async fn test_shutdown_before_first_window() {
        let dir = TempDir::new().unwrap();
        let store = InMemorySampleStore::with_samples([sample(utc(2020, 1, 15, 10), 70.0)]);
        let (ctx, tx) = context(store, &dir, utc(2020, 3, 15, 0), ReporterHandle::detached());
        tx.send(true).unwrap();

        let report = export_stream(&ctx, Some(watch_source())).await;

        assert_eq!(report.status, StreamStatus::Interrupted);
        assert!(report.artifacts.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = InMemorySampleStore::with_samples([sample(utc(2020, 1, 15, 10), 70.0)]);
        let (mut ctx, _tx) = context(store, &dir, utc(2020, 2, 15, 0), ReporterHandle::detached());
        ctx.settings.dry_run = true;

        let report = export_stream(&ctx, Some(watch_source())).await;

        assert_eq!(report.rows_exported, 1);
        assert!(report.artifacts.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_incremental_resumes_at_watermark() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let state = Arc::new(StateManager::new_with_storage(
            Arc::new(FileStateStorage::new(dir.path().join("state.json"))),
            false,
        ));
        let samples = [
            sample(utc(2020, 1, 15, 10), 70.0),
            sample(utc(2020, 2, 15, 10), 71.0),
        ];

        let (mut ctx, _tx) = context(
            InMemorySampleStore::with_samples(samples.clone()),
            &out,
            utc(2020, 2, 20, 0),
            ReporterHandle::detached(),
        );
        ctx.state = Some(state.clone());
        ctx.settings.mode = ExportMode::Incremental;
        let first = export_stream(&ctx, Some(watch_source())).await;
        assert_eq!(first.windows_processed, 2);

        let watermark = state
            .load_watermark(SampleKind::HeartRate, "com.example.watch")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(watermark.last_window_start, Some(utc(2020, 2, 1, 0)));
        assert!(watermark.is_completed());

        let second = export_stream(&ctx, Some(watch_source())).await;
        assert_eq!(second.windows_processed, 1);
        assert_eq!(second.artifacts[0].window_start, utc(2020, 2, 1, 0));
    }
}
