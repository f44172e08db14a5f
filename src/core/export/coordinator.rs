//! Export coordinator - main orchestrator for the export process
//!
//! Checks read authorization, discovers the sources of every configured kind,
//! runs one driver stream per source with bounded concurrency and folds the
//! stream reports into an [`ExportSummary`].

use super::clock::{Clock, SystemClock};
use super::discovery::discover_sources;
use super::driver::{export_stream, DriverContext, StreamSettings};
use super::retry::RetryPolicy;
use super::summary::{ExportError, ExportSummary, StreamReport};
use crate::adapters::store::{create_authorized_store, AuthorizedStore, SampleStore};
use crate::config::PulseConfig;
use crate::core::progress::{ProgressSink, StatusReporter, StatusSink};
use crate::core::state::{FileStateStorage, StateManager};
use crate::core::verification::Verifier;
use crate::domain::{BundleId, PulseError, Result, Source};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Export coordinator
pub struct ExportCoordinator {
    config: PulseConfig,
    store: Arc<AuthorizedStore>,
    state_manager: Option<Arc<StateManager>>,
    output_dir: PathBuf,
    clock: Arc<dyn Clock>,
    status_sink: Option<Arc<dyn StatusSink>>,
    progress_sink: Option<Arc<dyn ProgressSink>>,
    shutdown_signal: watch::Receiver<bool>,
}

impl ExportCoordinator {
    /// Create a coordinator reading from the store named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or no output directory
    /// can be resolved.
    pub fn new(config: PulseConfig, shutdown_signal: watch::Receiver<bool>) -> Result<Self> {
        let store = create_authorized_store(&config.store)?;
        Self::with_store(config, store, shutdown_signal)
    }

    /// Create a coordinator over an already opened store
    pub fn with_store(
        config: PulseConfig,
        store: AuthorizedStore,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Result<Self> {
        let output_dir = config
            .export
            .resolved_output_dir()
            .map_err(PulseError::Configuration)?;

        let state_manager = if config.state.enabled {
            let path = config.state.resolved_path(&output_dir);
            tracing::debug!(path = %path.display(), "Using watermark file");
            Some(Arc::new(StateManager::new_with_storage(
                Arc::new(FileStateStorage::new(path)),
                config.is_dry_run(),
            )))
        } else {
            None
        };

        Ok(Self {
            config,
            store: Arc::new(store),
            state_manager,
            output_dir,
            clock: Arc::new(SystemClock),
            status_sink: None,
            progress_sink: None,
            shutdown_signal,
        })
    }

    /// Replace the wall clock, e.g. to pin "now" in tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Forward status lines and progress updates to external sinks
    pub fn with_sinks(
        mut self,
        status_sink: Option<Arc<dyn StatusSink>>,
        progress_sink: Option<Arc<dyn ProgressSink>>,
    ) -> Self {
        self.status_sink = status_sink;
        self.progress_sink = progress_sink;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the export
    ///
    /// This is the main entry point for the export process. It:
    /// 1. Checks read authorization for every configured kind
    /// 2. For each kind:
    ///    - Discovers its sources (unless the export is unsegmented)
    ///    - Exports every source month by month, `parallel_sources` at a time
    /// 3. Verifies the written artifacts if enabled
    /// 4. Generates the summary, including the status log
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Authorization`] if any configured kind is not
    /// authorized. Every other failure is recorded in the summary.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let export = &self.config.export;
        let dry_run = self.config.is_dry_run();

        for kind in &export.kinds {
            self.store.authorization().require(*kind)?;
        }

        let filter = export
            .source_ids
            .iter()
            .map(|id| BundleId::new(id.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                PulseError::Configuration(format!("Invalid export.source_ids entry: {e}"))
            })?;

        tracing::info!(
            kinds = ?export.kinds,
            backend = self.store.backend_name(),
            output_dir = %self.output_dir.display(),
            mode = ?export.mode,
            dry_run,
            "Starting export process"
        );

        let mut summary = ExportSummary::new();
        summary.kinds = export.kinds.clone();
        summary.dry_run = dry_run;

        let reporter = StatusReporter::spawn_with_sinks(
            self.status_sink.clone(),
            self.progress_sink.clone(),
        );
        let retry =
            RetryPolicy::from_config(export).with_shutdown(self.shutdown_signal.clone());
        let store: Arc<dyn SampleStore> = self.store.clone();

        for kind in &export.kinds {
            if *self.shutdown_signal.borrow() {
                tracing::warn!(kind = %kind, "Shutdown requested, skipping remaining kinds");
                summary.interrupted = true;
                break;
            }

            let streams: Vec<Option<Source>> = if export.segment_by_source {
                match discover_sources(
                    store.as_ref(),
                    *kind,
                    &filter,
                    &retry,
                    &reporter.handle(),
                )
                .await
                {
                    Ok(sources) => {
                        summary.sources_discovered += sources.len();
                        sources.into_iter().map(Some).collect()
                    }
                    Err(_) if *self.shutdown_signal.borrow() => {
                        tracing::warn!(kind = %kind, "Shutdown requested during discovery");
                        summary.interrupted = true;
                        break;
                    }
                    Err(e) => {
                        tracing::error!(kind = %kind, error = %e, "Source discovery failed");
                        reporter
                            .handle()
                            .status(format!("Error discovering {kind} sources: {e}"));
                        summary.add_error(
                            ExportError::from_error(&e)
                                .with_context(format!("kind={}", kind.as_str())),
                        );
                        continue;
                    }
                }
            } else {
                vec![None]
            };

            let ctx = DriverContext {
                store: store.clone(),
                kind: *kind,
                settings: StreamSettings {
                    output_dir: self.output_dir.clone(),
                    encoding: export.encoding,
                    batch_size: export.batch_size,
                    progress_interval: export.progress_interval,
                    mode: export.mode,
                    dry_run,
                },
                retry: retry.clone(),
                clock: self.clock.clone(),
                reporter: reporter.handle(),
                state: self.state_manager.clone(),
                shutdown: self.shutdown_signal.clone(),
            };

            let mut reports: Vec<StreamReport> = stream::iter(streams)
                .map(|source| export_stream(&ctx, source))
                .buffer_unordered(export.parallel_sources.max(1))
                .collect()
                .await;
            reports.sort_by(|a, b| a.stream.cmp(&b.stream));

            for report in reports {
                summary.record_stream(report);
            }
        }

        if self.config.verification.enable_verification && !dry_run {
            tracing::info!("Running post-export verification");
            let verifier = Verifier::new(export.encoding);
            let verification_report = verifier.verify_artifacts(&summary.artifacts).await;
            if !verification_report.is_success() {
                for failure in &verification_report.failures {
                    tracing::warn!(
                        path = %failure.path.display(),
                        reason = %failure.reason,
                        "Verification failure"
                    );
                }
            }
            summary.set_verification_report(verification_report);
        }

        summary.status_log = reporter.finish().await;

        let duration = start_time.elapsed();
        summary = summary.with_duration(duration);
        summary.log_summary();

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::{InMemorySampleStore, ReadAuthorization};
    use crate::config::{
        ApplicationConfig, ExportConfig, LoggingConfig, OutputEncoding, StateConfig,
        StoreBackend, StoreConfig, VerificationConfig,
    };
    use crate::core::export::clock::FixedClock;
    use crate::domain::{Quantity, Sample, SampleKind, Unit};
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn sample(name: &str, bundle: &str, end: DateTime<Utc>) -> Sample {
        Sample::builder()
            .kind(SampleKind::HeartRate)
            .quantity(Quantity::new(65.0, Unit::CountPerMinute))
            .start_time(end)
            .end_time(end)
            .source(Source::new(name, BundleId::new(bundle).unwrap()))
            .build()
            .unwrap()
    }

    fn config(dir: &TempDir) -> PulseConfig {
        PulseConfig {
            application: ApplicationConfig::default(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
                ..StoreConfig::default()
            },
            export: ExportConfig {
                output_dir: Some(dir.path().to_path_buf()),
                encoding: OutputEncoding::Utf8,
                ..ExportConfig::default()
            },
            state: StateConfig::default(),
            verification: VerificationConfig {
                enable_verification: true,
            },
            logging: LoggingConfig::default(),
        }
    }

    fn coordinator(
        config: PulseConfig,
        store: InMemorySampleStore,
        authorization: ReadAuthorization,
    ) -> ExportCoordinator {
        let (_tx, rx) = watch::channel(false);
        let store = AuthorizedStore::new(Arc::new(store), authorization);
        ExportCoordinator::with_store(config, store, rx)
            .unwrap()
            .with_clock(Arc::new(FixedClock(utc(2020, 2, 15))))
    }

    #[tokio::test]
    async fn test_invalid_source_filter_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.export.source_ids = vec!["not a bundle".to_string()];
        let store = InMemorySampleStore::with_samples([sample(
            "Watch",
            "com.example.watch",
            utc(2020, 1, 10),
        )]);

        let result = coordinator(config, store, ReadAuthorization::grant(SampleKind::ALL))
            .execute_export()
            .await;

        assert!(matches!(result, Err(PulseError::Configuration(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_exports_every_source() {
        let dir = TempDir::new().unwrap();
        let store = InMemorySampleStore::with_samples([
            sample("Watch", "com.example.watch", utc(2020, 1, 10)),
            sample("Phone", "com.example.phone", utc(2020, 1, 11)),
        ]);

        let summary = coordinator(
            config(&dir),
            store,
            ReadAuthorization::grant([SampleKind::HeartRate]),
        )
        .execute_export()
        .await
        .unwrap();

        assert_eq!(summary.sources_discovered, 2);
        assert_eq!(summary.artifacts.len(), 2);
        assert_eq!(summary.rows_exported, 2);
        assert!(summary.is_successful());
        assert!(summary.verification_report.as_ref().unwrap().is_success());
        assert!(summary
            .status_log
            .contains("Source: Watch (com.example.watch)"));
        assert!(dir.path().join(".pulse-state.json").exists());
    }

    #[tokio::test]
    async fn test_unsegmented_export() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.export.segment_by_source = false;
        let store = InMemorySampleStore::with_samples([
            sample("Watch", "com.example.watch", utc(2020, 1, 10)),
            sample("Phone", "com.example.phone", utc(2020, 1, 11)),
        ]);

        let summary = coordinator(
            config,
            store,
            ReadAuthorization::grant([SampleKind::HeartRate]),
        )
        .execute_export()
        .await
        .unwrap();

        assert_eq!(summary.artifacts.len(), 1);
        assert_eq!(summary.artifacts[0].rows, 2);
        assert!(dir.path().join("heartrate-2020-01.tsv").exists());
    }

    #[tokio::test]
    async fn test_unauthorized_kind_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = InMemorySampleStore::with_samples([sample(
            "Watch",
            "com.example.watch",
            utc(2020, 1, 10),
        )]);

        let result = coordinator(config(&dir), store, ReadAuthorization::none())
            .execute_export()
            .await;

        assert!(matches!(
            result,
            Err(PulseError::Authorization(SampleKind::HeartRate))
        ));
        assert!(!dir
            .path()
            .join("Watch-com.example.watch-heartrate-2020-01.tsv")
            .exists());
    }

    #[tokio::test]
    async fn test_no_sources() {
        let dir = TempDir::new().unwrap();

        let summary = coordinator(
            config(&dir),
            InMemorySampleStore::new(),
            ReadAuthorization::grant([SampleKind::HeartRate]),
        )
        .execute_export()
        .await
        .unwrap();

        assert!(summary.artifacts.is_empty());
        assert_eq!(
            summary.status_log.lines,
            vec!["No sources found for heart rate samples"]
        );
    }
}
