//! Verification report structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of re-reading the artifacts of an export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// When the verification was performed
    pub verified_at: DateTime<Utc>,

    /// Artifacts checked
    pub total_verified: usize,

    /// Artifacts whose checksum and row count matched
    pub passed: usize,

    /// Artifacts that did not match or could not be read
    pub failed: usize,

    pub failures: Vec<VerificationFailure>,

    /// Duration of verification in milliseconds
    pub duration_ms: u64,
}

/// Details of a failed artifact verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationFailure {
    /// Artifact path
    pub path: PathBuf,

    /// Checksum recorded at commit time
    pub expected_checksum: String,

    /// Checksum of the file as read back, if it could be read
    pub actual_checksum: Option<String>,

    pub reason: String,
}

impl VerificationReport {
    pub fn new() -> Self {
        Self {
            verified_at: Utc::now(),
            total_verified: 0,
            passed: 0,
            failed: 0,
            failures: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_pass(&mut self) {
        self.total_verified += 1;
        self.passed += 1;
    }

    pub fn record_failure(&mut self, failure: VerificationFailure) {
        self.total_verified += 1;
        self.failed += 1;
        self.failures.push(failure);
    }

    pub fn set_duration(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }

    /// Check if all verifications passed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Format the report as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("📊 Verification Report\n");
        summary.push_str(&format!("  Verified at: {}\n", self.verified_at));
        summary.push_str(&format!("  Duration: {} ms\n", self.duration_ms));
        summary.push_str(&format!("  Artifacts verified: {}\n", self.total_verified));
        summary.push_str(&format!("  ✅ Passed: {}\n", self.passed));
        summary.push_str(&format!("  ❌ Failed: {}\n", self.failed));

        if !self.failures.is_empty() {
            summary.push_str("\n❌ Failures:\n");
            for (i, failure) in self.failures.iter().enumerate() {
                summary.push_str(&format!("  {}. {}\n", i + 1, failure.path.display()));
                summary.push_str(&format!("     Reason: {}\n", failure.reason));
            }
        }

        summary
    }
}

impl Default for VerificationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> VerificationFailure {
        VerificationFailure {
            path: PathBuf::from("exports/Watch-com.example.watch-heartrate-2020-01.tsv"),
            expected_checksum: "abc123".to_string(),
            actual_checksum: Some("def456".to_string()),
            reason: "Checksum mismatch".to_string(),
        }
    }

    #[test]
    fn test_new_report_is_success() {
        let report = VerificationReport::new();
        assert_eq!(report.total_verified, 0);
        assert!(report.failures.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn test_record_pass_and_failure() {
        let mut report = VerificationReport::new();
        report.record_pass();
        report.record_failure(failure());

        assert_eq!(report.total_verified, 2);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_format_summary() {
        let mut report = VerificationReport::new();
        report.record_pass();
        report.record_failure(failure());
        report.set_duration(15);

        let summary = report.format_summary();
        assert!(summary.contains("Artifacts verified: 2"));
        assert!(summary.contains("Duration: 15 ms"));
        assert!(summary.contains("heartrate-2020-01.tsv"));
        assert!(summary.contains("Reason: Checksum mismatch"));
    }
}
