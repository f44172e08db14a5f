//! Sample store adapters
//!
//! - [`traits`] - the read-only [`SampleStore`] interface and query types
//! - [`auth`] - read authorization capability and guarded store
//! - [`sqlite`] - SQLite file backend
//! - [`memory`] - in-memory backend
//! - [`factory`] - backend selection from configuration

pub mod auth;
pub mod factory;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use auth::{AuthorizedStore, ReadAuthorization};
pub use factory::{create_authorized_store, create_sample_store};
pub use memory::InMemorySampleStore;
pub use sqlite::SqliteSampleStore;
pub use traits::{
    Clause, QueryLimit, SamplePredicate, SampleQuery, SampleStore, SortOrder, TimeRange,
};
