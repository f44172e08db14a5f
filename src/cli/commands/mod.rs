//! CLI command implementations
//!
//! This module contains all CLI command implementations and the mapping from
//! outcomes to process exit codes.

pub mod export;
pub mod init;
pub mod sources;
pub mod status;
pub mod validate;

use crate::core::export::{ExportErrorType, ExportSummary};
use crate::domain::{PulseError, StoreError};

/// Exit code for an error that stopped a command
pub fn exit_code_for_error(error: &PulseError) -> i32 {
    match error {
        PulseError::Configuration(_) | PulseError::Validation(_) => 2,
        PulseError::Authorization(_) => 3,
        PulseError::StoreQuery(StoreError::Unavailable(_)) => 4,
        _ => 5,
    }
}

/// Exit code for a finished export
pub fn exit_code_for_summary(summary: &ExportSummary) -> i32 {
    if summary.interrupted {
        130 // SIGINT exit code (standard Unix convention)
    } else if summary.is_successful() {
        0
    } else if summary.artifacts.is_empty()
        && summary.has_error_type(ExportErrorType::StoreUnavailable)
    {
        4
    } else {
        1 // Partial success
    }
}
