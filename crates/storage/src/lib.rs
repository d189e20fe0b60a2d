//! Relational persistence for stoppage events.
//!
//! [`EventStore`] owns a SQLite pool. Every operation is self-contained:
//! acquire a connection, run inside its own transaction, commit, release.
//! Edits are new rows whose `id_origen` points at the oldest ancestor.

pub mod error;
pub mod lineage;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use lineage::group_by_origin;
pub use schema::{TableSchema, EVENTS};
pub use store::EventStore;
