//! Keystone Storage Layer
//!
//! SQLite-backed key-value persistence for the client session.
//! Callers only depend on the `KeyValueStore` contract.

mod database;
mod error;
mod migrations;
mod store;

pub use database::Database;
pub use error::StorageError;
pub use store::KeyValueStore;

pub type Result<T> = std::result::Result<T, StorageError>;
