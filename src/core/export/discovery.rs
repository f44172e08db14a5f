//! Source discovery

use super::retry::RetryPolicy;
use crate::adapters::store::SampleStore;
use crate::core::progress::ReporterHandle;
use crate::domain::{BundleId, Result, SampleKind, Source};

/// List the sources that recorded samples of `kind`
///
/// When `filter` is non-empty only sources whose bundle id appears in it are
/// returned. Every returned source is reported as `Source: {name} ({bundle})`;
/// finding none is reported once and is not an error.
pub async fn discover_sources(
    store: &dyn SampleStore,
    kind: SampleKind,
    filter: &[BundleId],
    retry: &RetryPolicy,
    reporter: &ReporterHandle,
) -> Result<Vec<Source>> {
    let mut sources = retry
        .run("sources_for_kind", || store.sources_for_kind(kind))
        .await?;

    if !filter.is_empty() {
        sources.retain(|source| filter.contains(&source.bundle_id));
    }

    tracing::info!(
        kind = %kind,
        backend = store.backend_name(),
        sources = sources.len(),
        "Discovered sources"
    );

    if sources.is_empty() {
        reporter.status(format!("No sources found for {kind} samples"));
    }
    for source in &sources {
        reporter.status(format!("Source: {source}"));
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::InMemorySampleStore;
    use crate::core::progress::StatusReporter;
    use crate::domain::{Quantity, Sample, Unit};
    use chrono::{TimeZone, Utc};

    fn sample(name: &str, bundle: &str) -> Sample {
        let at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        Sample::builder()
            .kind(SampleKind::HeartRate)
            .quantity(Quantity::new(60.0, Unit::CountPerMinute))
            .start_time(at)
            .end_time(at)
            .source(Source::new(name, BundleId::new(bundle).unwrap()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_discovers_and_reports_sources() {
        let store = InMemorySampleStore::with_samples([
            sample("Watch", "com.example.watch"),
            sample("Phone", "com.example.phone"),
            sample("Watch", "com.example.watch"),
        ]);
        let reporter = StatusReporter::spawn();

        let sources = discover_sources(
            &store,
            SampleKind::HeartRate,
            &[],
            &RetryPolicy::none(),
            &reporter.handle(),
        )
        .await
        .unwrap();

        assert_eq!(sources.len(), 2);
        let log = reporter.finish().await;
        assert!(log.contains("Source: Phone (com.example.phone)"));
        assert!(log.contains("Source: Watch (com.example.watch)"));
    }

    #[tokio::test]
    async fn test_filter_keeps_named_sources() {
        let store = InMemorySampleStore::with_samples([
            sample("Watch", "com.example.watch"),
            sample("Phone", "com.example.phone"),
        ]);

        let sources = discover_sources(
            &store,
            SampleKind::HeartRate,
            &[BundleId::new("com.example.watch").unwrap()],
            &RetryPolicy::none(),
            &ReporterHandle::detached(),
        )
        .await
        .unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "Watch");
    }

    #[tokio::test]
    async fn test_no_sources_is_reported() {
        let store = InMemorySampleStore::new();
        let reporter = StatusReporter::spawn();

        let sources = discover_sources(
            &store,
            SampleKind::HeartRate,
            &[],
            &RetryPolicy::none(),
            &reporter.handle(),
        )
        .await
        .unwrap();

        assert!(sources.is_empty());
        let log = reporter.finish().await;
        assert_eq!(log.lines, vec!["No sources found for heart rate samples"]);
    }
}
