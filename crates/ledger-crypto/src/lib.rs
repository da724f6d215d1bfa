// ledger-crypto/src/lib.rs

//! Identity primitives for the signup ledger
//!
//! This crate provides:
//! - SHA-256 hashing
//! - 20-byte account and contract addresses
//! - Deterministic contract address derivation

pub mod hash;
pub mod address;

pub use hash::{Hash, Hashable, HASH_SIZE};
pub use address::{contract_address, Address, ADDRESS_SIZE};

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while decoding identities
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
