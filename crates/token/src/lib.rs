// token/src/lib.rs

//! Fungible reward token
//!
//! Balances, allowances and role-gated supply changes for the token that
//! registries pay rewards in and collect costs with:
//! - Mint and burn behind MINTER / BURNER roles
//! - Transfers and allowance pulls, halted while paused
//! - Circulating supply (total supply minus the treasury's holding)

pub mod reward_token;

pub use reward_token::RewardToken;

use ledger_core::{AccessError, Amount, ErrorKind};

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Errors that can occur in token operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AccessError),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: Amount, available: Amount },

    #[error("Token is paused")]
    ContractPaused,

    #[error("Token is not paused")]
    NotPaused,

    #[error("Overflow error: {0}")]
    OverflowError(String),
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::Unauthorized(_) => ErrorKind::Unauthorized,
            TokenError::InsufficientBalance { .. } | TokenError::InsufficientAllowance { .. } => {
                ErrorKind::InsufficientFunds
            }
            TokenError::ContractPaused | TokenError::NotPaused => ErrorKind::Paused,
            TokenError::OverflowError(_) => ErrorKind::Overflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = TokenError::InsufficientAllowance {
            required: Amount::from_u64(2),
            available: Amount::zero(),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(TokenError::ContractPaused.kind(), ErrorKind::Paused);
    }
}
