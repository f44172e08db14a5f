//! Post-export verification
//!
//! Re-reads every committed artifact and checks it against the checksum and
//! row count recorded when it was written.

pub mod checksum;
pub mod report;
pub mod verify;

pub use report::{VerificationFailure, VerificationReport};
pub use verify::Verifier;
