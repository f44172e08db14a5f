//! Configuration management for Pulse.
//!
//! Pulse uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PULSE_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation with human-readable messages
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pulse::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pulse.toml")?;
//! println!("Store: {:?}", config.store.path);
//! println!("Batch size: {}", config.export.batch_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [store]
//! backend = "sqlite"
//! path = "${HOME}/health/samples.db"
//! authorized_kinds = ["heart_rate"]
//!
//! [export]
//! kinds = ["heart_rate"]
//! output_dir = "exports"
//! encoding = "utf16"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, ExportConfig, ExportMode, LoggingConfig, OutputEncoding, PulseConfig,
    StateConfig, StoreBackend, StoreConfig, VerificationConfig,
};
