//! Sample source model
//!
//! A [`Source`] is the device or app that recorded a sample. It is used both as
//! a query filter and as the namespace of output filenames.

use crate::domain::ids::BundleId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contributor to a sample stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Source {
    /// Human-readable name, e.g. "Isaac's Apple Watch"
    pub name: String,

    /// Stable machine-readable identifier
    pub bundle_id: BundleId,
}

impl Source {
    /// Create a new source
    pub fn new(name: impl Into<String>, bundle_id: BundleId) -> Self {
        Self {
            name: name.into(),
            bundle_id,
        }
    }

    /// Filename prefix for this source's artifacts: `{name}-{bundle_id}`
    ///
    /// Path separators and control characters in the display name are replaced
    /// with `_` so the artifact always lands in the output directory.
    pub fn file_prefix(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| {
                if c == '/' || c == '\\' || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        format!("{}-{}", name, self.bundle_id.as_str())
    }

    /// Stable key used for watermarks and progress streams
    pub fn key(&self) -> String {
        self.bundle_id.as_str().to_string()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.bundle_id)
    }
}
