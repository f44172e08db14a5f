//! Domain identifier types with validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bundle identifier newtype wrapper
///
/// Stable machine-readable identifier of the app or device that contributed
/// samples, e.g. `com.apple.health.8C1F2A`.
///
/// # Examples
///
/// ```
/// use pulse::domain::ids::BundleId;
/// use std::str::FromStr;
///
/// let id = BundleId::from_str("com.example.watch").unwrap();
/// assert_eq!(id.as_str(), "com.example.watch");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleId(String);

impl BundleId {
    /// Creates a new BundleId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(BundleId)` if the ID is valid, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Bundle ID cannot be empty".to_string());
        }
        if id.chars().any(|c| c.is_whitespace()) {
            return Err(format!("Bundle ID cannot contain whitespace: '{id}'"));
        }
        Ok(Self(id))
    }

    /// Returns the bundle ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BundleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for BundleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
