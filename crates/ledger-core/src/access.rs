// ledger-core/src/access.rs

use ledger_crypto::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Privileged roles on the reward token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Minter,
    Burner,
    Pauser,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Minter, Role::Burner, Role::Pauser];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN_ROLE",
            Role::Minter => "MINTER_ROLE",
            Role::Burner => "BURNER_ROLE",
            Role::Pauser => "PAUSER_ROLE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access check failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("account {account} is missing role {role}")]
    MissingRole { account: Address, role: Role },

    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Address },
}

/// Set of accounts per role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access control with every role held by `admin`
    pub fn with_admin(admin: Address) -> Self {
        let mut access = Self::new();
        for role in Role::ALL {
            access.grant(role, admin);
        }
        access
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    pub fn require_role(&self, role: Role, account: &Address) -> Result<(), AccessError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            tracing::warn!("{} rejected: {} lacks the role", role, account);
            Err(AccessError::MissingRole { account: *account, role })
        }
    }

    /// Returns `true` if the account did not already hold the role
    pub fn grant(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Returns `true` if the account held the role
    pub fn revoke(&mut self, role: Role, account: &Address) -> bool {
        self.members
            .get_mut(&role)
            .map(|set| set.remove(account))
            .unwrap_or(false)
    }

    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.members.get(&role).into_iter().flatten()
    }
}

/// Single-owner gate used by registries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    owner: Address,
}

impl Ownership {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        self.owner == *caller
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), AccessError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            tracing::warn!("owner-only call rejected for {}", caller);
            Err(AccessError::NotOwner { caller: *caller })
        }
    }
}
