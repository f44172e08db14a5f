//! Sources command implementation
//!
//! Lists the sources that recorded samples of each configured kind, with the
//! number of samples each one holds.

use super::exit_code_for_error;
use crate::adapters::store::{create_authorized_store, SamplePredicate, SampleStore};
use crate::config::{load_config, StoreBackend};
use crate::domain::{Result, SampleKind, Source};
use clap::Args;

/// Arguments for the sources command
#[derive(Args, Debug, Default)]
pub struct SourcesArgs {
    /// Override the sample store path
    #[arg(long)]
    pub store: Option<String>,
}

impl SourcesArgs {
    /// Execute the sources command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Listing sample sources");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };
        if let Some(store) = &self.store {
            config.store.path = Some(store.into());
            if store.ends_with(".json") {
                config.store.backend = StoreBackend::Memory;
            }
        }

        let store = match create_authorized_store(&config.store) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to open sample store");
                println!("   Error: {e}");
                return Ok(exit_code_for_error(&e));
            }
        };

        println!("📱 Sample sources ({})", store.backend_name());
        println!();

        for kind in &config.export.kinds {
            if let Err(e) = store.authorization().require(*kind) {
                println!("❌ {e}");
                return Ok(exit_code_for_error(&e));
            }

            let counted = match count_by_source(&store, *kind).await {
                Ok(c) => c,
                Err(e) => {
                    println!("❌ Failed to list {kind} sources");
                    println!("   Error: {e}");
                    return Ok(exit_code_for_error(&e));
                }
            };

            println!("{kind}:");
            if counted.is_empty() {
                println!("  No sources found for {kind} samples");
            }
            for (source, count) in counted {
                println!("  {:<40} {:>10}", source.to_string(), count);
            }
            println!();
        }

        Ok(0)
    }
}

/// Sources of `kind` with their sample counts, in discovery order
async fn count_by_source(store: &dyn SampleStore, kind: SampleKind) -> Result<Vec<(Source, u64)>> {
    let mut counted = Vec::new();
    for source in store.sources_for_kind(kind).await? {
        let count = store
            .count(kind, &SamplePredicate::for_source(&source))
            .await?;
        counted.push((source, count));
    }
    Ok(counted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::InMemorySampleStore;
    use crate::domain::{BundleId, Quantity, Sample, Unit};
    use chrono::{TimeZone, Utc};

    fn sample(name: &str, bundle: &str) -> Sample {
        let at = Utc.with_ymd_and_hms(2020, 1, 10, 8, 0, 0).unwrap();
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
    async fn test_count_by_source() {
        let store = InMemorySampleStore::with_samples([
            sample("Watch", "com.example.watch"),
            sample("Watch", "com.example.watch"),
            sample("Phone", "com.example.phone"),
        ]);

        let counted = count_by_source(&store, SampleKind::HeartRate).await.unwrap();
        let total: u64 = counted.iter().map(|(_, c)| c).sum();
        assert_eq!(counted.len(), 2);
        assert_eq!(total, 3);

        let steps = count_by_source(&store, SampleKind::StepCount).await.unwrap();
        assert!(steps.is_empty());
    }

    #[tokio::test]
    async fn test_missing_config() {
        let code = SourcesArgs::default()
            .execute("/nonexistent/pulse.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
