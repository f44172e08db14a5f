//! Sample store factory
//!
//! Builds the configured sample store backend and wraps it with the read
//! authorization granted in the configuration.

use super::auth::{AuthorizedStore, ReadAuthorization};
use super::memory::InMemorySampleStore;
use super::sqlite::SqliteSampleStore;
use super::traits::SampleStore;
use crate::config::schema::{StoreBackend, StoreConfig};
use crate::domain::{PulseError, Result};
use std::sync::Arc;

/// Create the sample store described by `config`
///
/// # Errors
///
/// Returns [`PulseError::StoreQuery`] if the backend cannot be opened and
/// [`PulseError::Configuration`] if a required path is missing.
pub fn create_sample_store(config: &StoreConfig) -> Result<Arc<dyn SampleStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let path = config.path.as_ref().ok_or_else(|| {
                PulseError::Configuration(
                    "store.path is required when store.backend = 'sqlite'".to_string(),
                )
            })?;

            tracing::info!(path = %path.display(), "Creating SQLite sample store");
            Ok(Arc::new(SqliteSampleStore::open(path)?))
        }
        StoreBackend::Memory => {
            let store = match &config.path {
                Some(path) => {
                    tracing::info!(
                        path = %path.display(),
                        "Creating in-memory sample store from file"
                    );
                    InMemorySampleStore::from_json_file(path)?
                }
                None => {
                    tracing::info!("Creating empty in-memory sample store");
                    InMemorySampleStore::new()
                }
            };
            Ok(Arc::new(store))
        }
    }
}

/// Create the configured store guarded by its configured read authorization
pub fn create_authorized_store(config: &StoreConfig) -> Result<AuthorizedStore> {
    let inner = create_sample_store(config)?;
    let authorization = ReadAuthorization::grant(config.authorized_kinds.iter().copied());
    Ok(AuthorizedStore::new(inner, authorization))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SampleKind, StoreError};
    use std::path::PathBuf;

    #[test]
    fn test_memory_backend_without_path() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        let store = create_sample_store(&config).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_sqlite_backend_missing_file() {
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            path: Some(PathBuf::from("/nonexistent/pulse/health.db")),
            ..StoreConfig::default()
        };
        assert!(matches!(
            create_sample_store(&config),
            Err(PulseError::StoreQuery(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_authorized_store_uses_configured_kinds() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            authorized_kinds: vec![SampleKind::StepCount],
            ..StoreConfig::default()
        };
        let store = create_authorized_store(&config).unwrap();
        assert!(store.authorization().allows(SampleKind::StepCount));
        assert!(!store.authorization().allows(SampleKind::HeartRate));
    }
}
