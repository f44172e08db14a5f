//! Artifact verification
//!
//! Each artifact is read back from disk, its checksum recomputed and its text
//! decoded. The header must match the kind and every data row must parse and
//! end inside the artifact's window.

use super::checksum::calculate_checksum_bytes;
use super::report::{VerificationFailure, VerificationReport};
use crate::adapters::output::encoding::decode;
use crate::config::OutputEncoding;
use crate::core::export::summary::ExportedArtifact;
use crate::core::serialize::{header, parse_row};
use chrono::SubsecRound;
use std::time::Instant;

/// Verifier for committed artifacts
pub struct Verifier {
    encoding: OutputEncoding,
}

impl Verifier {
    /// Create a verifier for artifacts written in `encoding`
    pub fn new(encoding: OutputEncoding) -> Self {
        Self { encoding }
    }

    /// Verify every artifact, collecting failures instead of stopping
    pub async fn verify_artifacts(&self, artifacts: &[ExportedArtifact]) -> VerificationReport {
        let started = Instant::now();
        let mut report = VerificationReport::new();

        tracing::info!(artifacts = artifacts.len(), "Starting artifact verification");

        for artifact in artifacts {
            match self.verify_artifact(artifact).await {
                Ok(()) => report.record_pass(),
                Err(failure) => {
                    tracing::warn!(
                        path = %failure.path.display(),
                        reason = %failure.reason,
                        "Artifact verification failed"
                    );
                    report.record_failure(failure);
                }
            }
        }

        report.set_duration(started.elapsed().as_millis() as u64);
        tracing::info!(
            passed = report.passed,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Verification completed"
        );
        report
    }

    async fn verify_artifact(
        &self,
        artifact: &ExportedArtifact,
    ) -> std::result::Result<(), VerificationFailure> {
        let fail = |actual: Option<String>, reason: String| VerificationFailure {
            path: artifact.path.clone(),
            expected_checksum: artifact.checksum.clone(),
            actual_checksum: actual,
            reason,
        };

        let bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| fail(None, format!("cannot read artifact: {e}")))?;

        let actual = calculate_checksum_bytes(&bytes);
        if !actual.eq_ignore_ascii_case(&artifact.checksum) {
            return Err(fail(Some(actual), "Checksum mismatch".to_string()));
        }

        let text = decode(&bytes, self.encoding)
            .map_err(|e| fail(Some(actual.clone()), e.to_string()))?;
        let mut lines = text.lines();

        let expected_header = header(artifact.kind);
        if lines.next() != Some(expected_header.as_str()) {
            return Err(fail(Some(actual), "Missing or unexpected header".to_string()));
        }

        // Rows carry whole seconds
        let window_start = artifact.window_start.trunc_subsecs(0);
        let mut rows = 0;
        for (index, line) in lines.enumerate() {
            let row = parse_row(line)
                .map_err(|e| fail(Some(actual.clone()), format!("row {}: {}", index + 1, e)))?;
            if row.end_time < window_start || row.end_time >= artifact.window_end {
                return Err(fail(
                    Some(actual),
                    format!("row {} ends outside the artifact's window", index + 1),
                ));
            }
            rows += 1;
        }

        if rows != artifact.rows {
            return Err(fail(
                Some(actual),
                format!("expected {} rows, found {}", artifact.rows, rows),
            ));
        }

        Ok(())
    }
}
