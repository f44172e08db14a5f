//! Domain models and types for Pulse.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`BundleId`])
//! - **Domain models** ([`Sample`], [`Source`], [`SampleKind`], [`Quantity`])
//! - **Error types** ([`PulseError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, PulseError>`]:
//!
//! ```rust
//! use pulse::domain::{PulseError, Result, SampleKind};
//!
//! fn require_heart_rate(kinds: &[SampleKind]) -> Result<()> {
//!     if !kinds.contains(&SampleKind::HeartRate) {
//!         return Err(PulseError::Authorization(SampleKind::HeartRate));
//!     }
//!     Ok(())
//! }
//! # assert!(require_heart_rate(&[]).is_err());
//! ```

pub mod errors;
pub mod ids;
pub mod kind;
pub mod result;
pub mod sample;
pub mod source;

// Re-export commonly used types for convenience
pub use errors::{PulseError, StoreError};
pub use ids::BundleId;
pub use kind::{Quantity, SampleKind, Unit};
pub use result::Result;
pub use sample::{Metadata, Sample, SampleBuilder};
pub use source::Source;
