//! Export orchestration
//!
//! This module provides the core export logic for Pulse, including:
//! - Month windows and their bootstrapping
//! - Source discovery
//! - The per-source chunked export driver
//! - Export coordination and orchestration
//! - Summary and reporting

pub mod clock;
pub mod coordinator;
pub mod discovery;
pub mod driver;
pub mod retry;
pub mod summary;
pub mod window;

pub use clock::{Clock, FixedClock, SystemClock};
pub use coordinator::ExportCoordinator;
pub use discovery::discover_sources;
pub use driver::{export_stream, DriverContext, StreamSettings};
pub use retry::RetryPolicy;
pub use summary::{
    ExportError, ExportErrorType, ExportSummary, ExportedArtifact, StreamReport, StreamStatus,
};
pub use window::{find_earliest_sample, first_instant_of_next_month, ExportWindow};
