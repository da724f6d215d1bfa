// ledger-core/src/context.rs

use crate::Timestamp;
use ledger_crypto::Address;
use serde::{Deserialize, Serialize};

/// Who is calling and when.
///
/// Every mutating ledger operation receives one. Time is an input, never
/// read from a clock inside a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }

    /// Same caller at a different instant
    pub fn at(&self, now: Timestamp) -> Self {
        Self { caller: self.caller, now }
    }

    /// Different caller at the same instant
    pub fn as_caller(&self, caller: Address) -> Self {
        Self { caller, now: self.now }
    }
}
