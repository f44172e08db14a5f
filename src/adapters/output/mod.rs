//! Output artifact adapters
//!
//! - [`encoding`] - UTF-16LE/UTF-8 text encoding of artifacts
//! - [`artifact`] - temporary-file writer with atomic commit

pub mod artifact;
pub mod encoding;

pub use artifact::{ArtifactWriter, CommittedArtifact};
