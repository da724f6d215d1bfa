// storage/src/lib.rs

//! Persistent Storage Layer
//!
//! This crate persists the ledger using RocksDB:
//! - Token state and factory partitions
//! - Event and welfare registries keyed by address
//! - The contract log, appended incrementally in commit order

pub mod db;

pub use db::{ColumnFamily, Database, DatabaseConfig, DatabaseStats};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),
}
