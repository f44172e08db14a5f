//! External system integrations for Pulse.
//!
//! - [`store`] - Read-only sample store (SQLite file or in-memory) behind an
//!   authorization capability
//! - [`output`] - Artifact encoding and atomic persistence
//!
//! # Sample Store
//!
//! ```rust,no_run
//! use pulse::adapters::store::{AuthorizedStore, ReadAuthorization, SqliteSampleStore};
//! use pulse::domain::SampleKind;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteSampleStore::open(Path::new("health.db"))?;
//! let store = AuthorizedStore::new(
//!     Arc::new(store),
//!     ReadAuthorization::grant([SampleKind::HeartRate]),
//! );
//! # Ok(())
//! # }
//! ```

pub mod output;
pub mod store;
