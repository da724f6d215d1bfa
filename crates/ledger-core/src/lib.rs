// ledger-core/src/lib.rs

//! Core data structures shared by every contract on the signup ledger
//!
//! This crate provides:
//! - Token amounts and timestamps
//! - The per-call execution context (caller + current time)
//! - Role and ownership access control
//! - The append-only contract log and call receipts

pub mod types;
pub mod context;
pub mod access;
pub mod log;

pub use types::*;
pub use context::CallContext;
pub use access::{AccessControl, AccessError, Ownership, Role};
pub use log::{ContractEvent, EventLog, Log, LogRecord, Receipt};

use serde::{Deserialize, Serialize};

/// Coarse classification every ledger error maps onto.
///
/// Callers branch on the kind; the concrete error carries the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Construction parameters violate an ordering or range rule
    Validation,
    /// Role or owner check failed
    Unauthorized,
    /// Registry has been deactivated
    NotActive,
    /// Operation attempted outside its time window
    Phase,
    /// Registry already holds `max_capacity` members
    CapacityExceeded,
    /// Participant already performed this one-shot action
    DuplicateAction,
    /// Unknown participant or registry reference
    NotFound,
    /// Balance or allowance too small for the movement
    InsufficientFunds,
    /// Token transfers are paused
    Paused,
    /// Arithmetic overflow
    Overflow,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotActive => "not-active",
            ErrorKind::Phase => "phase",
            ErrorKind::CapacityExceeded => "capacity-exceeded",
            ErrorKind::DuplicateAction => "duplicate-action",
            ErrorKind::NotFound => "not-found",
            ErrorKind::InsufficientFunds => "insufficient-funds",
            ErrorKind::Paused => "paused",
            ErrorKind::Overflow => "overflow",
        };
        f.write_str(name)
    }
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Unauthorized
    }
}
