// registry/src/lib.rs

//! Time-windowed signup registries
//!
//! This crate implements the two registry variants and their lifecycle:
//! - Event: sign up, then check in during the event to earn a reward
//! - Welfare: pay a cost at sign-up, then redeem before the deadline
//! - Factories that deploy, fund and archive registries
//! - The ledger that sequences every call atomically

pub mod config;
pub mod phase;
pub mod membership;
pub mod event;
pub mod welfare;
pub mod factory;
pub mod ledger;

pub use config::{EventConfig, WelfareConfig};
pub use phase::{EventPhase, WelfarePhase};
pub use membership::Membership;
pub use event::{EventDetails, EventSignup, RewardSource};
pub use welfare::{WelfareDetails, WelfareSignup};
pub use factory::RegistryFactory;
pub use ledger::{GenesisConfig, Ledger, LedgerSnapshot};

use ledger_core::{AccessError, Amount, ErrorKind, RegistryKind};
use ledger_crypto::Address;
use token::TokenError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur in registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AccessError),

    #[error("Registry is not active")]
    NotActive,

    #[error("Signup has not started yet")]
    SignupNotStarted,

    #[error("Signup has ended")]
    SignupEnded,

    #[error("Event has not started yet")]
    EventNotStarted,

    #[error("Event has ended")]
    EventEnded,

    #[error("Redemption time has ended")]
    RedemptionEnded,

    #[error("Registry is full (capacity {capacity})")]
    RegistryFull { capacity: u32 },

    #[error("Already signed up")]
    AlreadyRegistered,

    #[error("Already checked in")]
    AlreadyCheckedIn,

    #[error("Already redeemed")]
    AlreadyRedeemed,

    #[error("{participant} is not signed up")]
    NotRegistered { participant: Address },

    #[error("Registry not found: {0}")]
    RegistryNotFound(Address),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidConfig(_) => ErrorKind::Validation,
            RegistryError::Unauthorized(_) => ErrorKind::Unauthorized,
            RegistryError::NotActive => ErrorKind::NotActive,
            RegistryError::SignupNotStarted
            | RegistryError::SignupEnded
            | RegistryError::EventNotStarted
            | RegistryError::EventEnded
            | RegistryError::RedemptionEnded => ErrorKind::Phase,
            RegistryError::RegistryFull { .. } => ErrorKind::CapacityExceeded,
            RegistryError::AlreadyRegistered
            | RegistryError::AlreadyCheckedIn
            | RegistryError::AlreadyRedeemed => ErrorKind::DuplicateAction,
            RegistryError::NotRegistered { .. } | RegistryError::RegistryNotFound(_) => {
                ErrorKind::NotFound
            }
            RegistryError::Token(err) => err.kind(),
        }
    }
}

/// Behaviour a factory needs from the registry variant it deploys
pub trait Registry: Sized {
    type Config: Clone + std::fmt::Debug;

    const KIND: RegistryKind;

    /// Build a factory-created instance; rejects invalid configs
    fn deploy(address: Address, creator: Address, config: Self::Config) -> RegistryResult<Self>;

    /// Tokens the factory transfers into the new instance
    fn required_funding(&self) -> RegistryResult<Amount>;

    fn address(&self) -> Address;

    fn creator(&self) -> Address;

    fn is_active(&self) -> bool;

    fn attendee_count(&self) -> u32;
}
