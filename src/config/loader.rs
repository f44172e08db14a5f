//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{ExportMode, OutputEncoding, PulseConfig, StoreBackend};
use crate::domain::errors::PulseError;
use crate::domain::result::Result;
use crate::domain::SampleKind;
use regex::Regex;
use serde::de::value::StrDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into PulseConfig
/// 4. Applies environment variable overrides (PULSE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`PulseError::Configuration`] if the file cannot be read or parsed,
/// a referenced environment variable is missing, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use pulse::config::loader::load_config;
///
/// let config = load_config("pulse.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PulseConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PulseError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PulseError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: PulseConfig = toml::from_str(&contents)
        .map_err(|e| PulseError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PulseError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PulseError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed = processed.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed);
    }

    if !missing_vars.is_empty() {
        return Err(PulseError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_kinds(name: &str, value: &str) -> Result<Vec<SampleKind>> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            SampleKind::from_str(s).map_err(|e| PulseError::Configuration(format!("{name}: {e}")))
        })
        .collect()
}

fn parse_enum<T: DeserializeOwned>(name: &str, value: &str) -> Result<T> {
    let deserializer: StrDeserializer<'_, serde::de::value::Error> =
        value.trim().into_deserializer();
    T::deserialize(deserializer).map_err(|e| PulseError::Configuration(format!("{name}: {e}")))
}

/// Applies environment variable overrides using PULSE_* prefix
///
/// Environment variables follow the pattern: PULSE_<SECTION>_<KEY>
/// For example: PULSE_STORE_PATH, PULSE_EXPORT_MODE
fn apply_env_overrides(config: &mut PulseConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("PULSE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("PULSE_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Store overrides
    if let Ok(val) = std::env::var("PULSE_STORE_BACKEND") {
        config.store.backend = parse_enum::<StoreBackend>("PULSE_STORE_BACKEND", &val)?;
    }
    if let Ok(val) = std::env::var("PULSE_STORE_PATH") {
        config.store.path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("PULSE_STORE_AUTHORIZED_KINDS") {
        config.store.authorized_kinds = parse_kinds("PULSE_STORE_AUTHORIZED_KINDS", &val)?;
    }

    // Export overrides
    if let Ok(val) = std::env::var("PULSE_EXPORT_KINDS") {
        config.export.kinds = parse_kinds("PULSE_EXPORT_KINDS", &val)?;
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_MODE") {
        config.export.mode = parse_enum::<ExportMode>("PULSE_EXPORT_MODE", &val)?;
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_OUTPUT_DIR") {
        config.export.output_dir = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_ENCODING") {
        config.export.encoding = parse_enum::<OutputEncoding>("PULSE_EXPORT_ENCODING", &val)?;
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_SEGMENT_BY_SOURCE") {
        config.export.segment_by_source = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.export.batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_PARALLEL_SOURCES") {
        if let Ok(parallel) = val.parse() {
            config.export.parallel_sources = parallel;
        }
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.export.max_retries = retries;
        }
    }
    if let Ok(val) = std::env::var("PULSE_EXPORT_DRY_RUN") {
        config.export.dry_run = val.parse().unwrap_or(false);
    }

    // State overrides
    if let Ok(val) = std::env::var("PULSE_STATE_ENABLED") {
        config.state.enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("PULSE_STATE_PATH") {
        config.state.path = Some(PathBuf::from(val));
    }

    // Verification overrides
    if let Ok(val) = std::env::var("PULSE_VERIFICATION_ENABLE_VERIFICATION") {
        config.verification.enable_verification = val.parse().unwrap_or(false);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("PULSE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("PULSE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("PULSE_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
