// token/src/reward_token.rs

use crate::{TokenError, TokenResult};
use ledger_core::{AccessControl, Amount, ContractEvent, Log, Role};
use ledger_crypto::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reward token ledger
///
/// Every mutating call takes the calling account and a buffer that
/// receives the emitted logs. A call either succeeds completely or returns
/// an error without touching balances, allowances or the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardToken {
    /// Contract address of the token
    address: Address,
    name: String,
    symbol: String,
    /// Deployer; receives the initial supply and every role
    treasury: Address,
    balances: HashMap<Address, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    /// Cumulative amount ever credited to each account
    received: HashMap<Address, Amount>,
    total_supply: Amount,
    total_minted: Amount,
    total_burned: Amount,
    paused: bool,
    access: AccessControl,
}

impl RewardToken {
    /// Deploy the token, minting `initial_supply` to the treasury
    pub fn new(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        treasury: Address,
        initial_supply: Amount,
        logs: &mut Vec<Log>,
    ) -> Self {
        let mut token = Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            treasury,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            received: HashMap::new(),
            total_supply: Amount::zero(),
            total_minted: Amount::zero(),
            total_burned: Amount::zero(),
            paused: false,
            access: AccessControl::with_admin(treasury),
        };

        if !initial_supply.is_zero() {
            token.credit(treasury, &initial_supply);
            token.total_supply = initial_supply.clone();
            token.total_minted = initial_supply.clone();
            logs.push(token.log(ContractEvent::Transfer {
                from: None,
                to: Some(treasury),
                amount: initial_supply,
            }));
        }

        tracing::info!(
            "Token {} ({}) deployed at {}, supply {} held by {}",
            token.name,
            token.symbol,
            token.address,
            token.total_supply,
            treasury
        );

        token
    }

    // ==================== QUERIES ====================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Account that received the initial supply
    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).cloned().unwrap_or_else(Amount::zero)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .cloned()
            .unwrap_or_else(Amount::zero)
    }

    pub fn total_supply(&self) -> &Amount {
        &self.total_supply
    }

    pub fn total_minted(&self) -> &Amount {
        &self.total_minted
    }

    pub fn total_burned(&self) -> &Amount {
        &self.total_burned
    }

    /// Balance held by the treasury/admin account
    pub fn admin_balance(&self) -> Amount {
        self.balance_of(&self.treasury)
    }

    /// Total supply minus the treasury's holding
    pub fn circulating_supply(&self) -> Amount {
        self.total_supply.saturating_sub(&self.admin_balance())
    }

    /// Cumulative amount ever credited to `account` by mint or transfer
    pub fn received_volume(&self, account: &Address) -> Amount {
        self.received.get(account).cloned().unwrap_or_else(Amount::zero)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.access.has_role(role, account)
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    // ==================== SUPPLY ====================

    /// Mint new tokens to `to` (MINTER_ROLE)
    pub fn mint(
        &mut self,
        caller: &Address,
        to: Address,
        amount: &Amount,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        self.access.require_role(Role::Minter, caller)?;

        let total_supply = self.total_supply.checked_add(amount)
            .ok_or_else(|| TokenError::OverflowError("Total supply overflow".into()))?;
        let total_minted = self.total_minted.checked_add(amount)
            .ok_or_else(|| TokenError::OverflowError("Total minted overflow".into()))?;

        self.credit(to, amount);
        self.total_supply = total_supply;
        self.total_minted = total_minted;

        tracing::debug!("Minted {} to {}", amount, to);
        logs.push(self.log(ContractEvent::Transfer {
            from: None,
            to: Some(to),
            amount: amount.clone(),
        }));
        Ok(())
    }

    /// Burn tokens held by `from` (BURNER_ROLE)
    pub fn burn(
        &mut self,
        caller: &Address,
        from: Address,
        amount: &Amount,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        self.access.require_role(Role::Burner, caller)?;

        let remaining = self.checked_debit(&from, amount)?;
        let total_supply = self.total_supply.checked_sub(amount)
            .ok_or_else(|| TokenError::OverflowError("Total supply underflow".into()))?;
        let total_burned = self.total_burned.checked_add(amount)
            .ok_or_else(|| TokenError::OverflowError("Total burned overflow".into()))?;

        self.balances.insert(from, remaining);
        self.total_supply = total_supply;
        self.total_burned = total_burned;

        tracing::debug!("Burned {} from {}", amount, from);
        logs.push(self.log(ContractEvent::Transfer {
            from: Some(from),
            to: None,
            amount: amount.clone(),
        }));
        Ok(())
    }

    // ==================== TRANSFERS ====================

    /// Move `amount` from the caller to `to`
    pub fn transfer(
        &mut self,
        caller: &Address,
        to: Address,
        amount: &Amount,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        self.require_not_paused()?;
        self.move_balance(*caller, to, amount)?;

        logs.push(self.log(ContractEvent::Transfer {
            from: Some(*caller),
            to: Some(to),
            amount: amount.clone(),
        }));
        Ok(())
    }

    /// Set the caller's allowance for `spender` to exactly `amount`
    pub fn approve(&mut self, caller: &Address, spender: Address, amount: &Amount, logs: &mut Vec<Log>) {
        self.set_allowance(*caller, spender, amount.clone());
        logs.push(self.log(ContractEvent::Approval {
            owner: *caller,
            spender,
            amount: amount.clone(),
        }));
    }

    pub fn increase_allowance(
        &mut self,
        caller: &Address,
        spender: Address,
        added: &Amount,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        let updated = self.allowance(caller, &spender).checked_add(added)
            .ok_or_else(|| TokenError::OverflowError("Allowance overflow".into()))?;
        self.approve(caller, spender, &updated, logs);
        Ok(())
    }

    pub fn decrease_allowance(
        &mut self,
        caller: &Address,
        spender: Address,
        subtracted: &Amount,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        let current = self.allowance(caller, &spender);
        let updated = current.checked_sub(subtracted)
            .ok_or_else(|| TokenError::InsufficientAllowance {
                required: subtracted.clone(),
                available: current.clone(),
            })?;
        self.approve(caller, spender, &updated, logs);
        Ok(())
    }

    /// Pull `amount` from `from` to `to` using the caller's allowance
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: Address,
        to: Address,
        amount: &Amount,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        self.require_not_paused()?;

        let available = self.allowance(&from, caller);
        let remaining_allowance = available.checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientAllowance {
                required: amount.clone(),
                available: available.clone(),
            })?;

        self.move_balance(from, to, amount)?;
        self.set_allowance(from, *caller, remaining_allowance);

        logs.push(self.log(ContractEvent::Transfer {
            from: Some(from),
            to: Some(to),
            amount: amount.clone(),
        }));
        Ok(())
    }

    // ==================== ADMINISTRATION ====================

    /// Halt transfers (PAUSER_ROLE). Mint, burn and approve stay available.
    pub fn pause(&mut self, caller: &Address, logs: &mut Vec<Log>) -> TokenResult<()> {
        self.access.require_role(Role::Pauser, caller)?;
        self.require_not_paused()?;

        self.paused = true;
        tracing::info!("Token {} paused by {}", self.symbol, caller);
        logs.push(self.log(ContractEvent::Paused { account: *caller }));
        Ok(())
    }

    pub fn unpause(&mut self, caller: &Address, logs: &mut Vec<Log>) -> TokenResult<()> {
        self.access.require_role(Role::Pauser, caller)?;
        if !self.paused {
            return Err(TokenError::NotPaused);
        }

        self.paused = false;
        tracing::info!("Token {} unpaused by {}", self.symbol, caller);
        logs.push(self.log(ContractEvent::Unpaused { account: *caller }));
        Ok(())
    }

    /// Grant a role (ADMIN_ROLE). Granting a held role is a no-op without a log.
    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        self.access.require_role(Role::Admin, caller)?;

        if self.access.grant(role, account) {
            tracing::info!("{} granted to {}", role, account);
            logs.push(self.log(ContractEvent::RoleGranted {
                role,
                account,
                sender: *caller,
            }));
        }
        Ok(())
    }

    /// Revoke a role (ADMIN_ROLE). Revoking an absent role is a no-op without a log.
    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
        logs: &mut Vec<Log>,
    ) -> TokenResult<()> {
        self.access.require_role(Role::Admin, caller)?;

        if self.access.revoke(role, &account) {
            tracing::info!("{} revoked from {}", role, account);
            logs.push(self.log(ContractEvent::RoleRevoked {
                role,
                account,
                sender: *caller,
            }));
        }
        Ok(())
    }

    // ==================== INTERNALS ====================

    fn log(&self, event: ContractEvent) -> Log {
        Log::new(self.address, event)
    }

    fn require_not_paused(&self) -> TokenResult<()> {
        if self.paused {
            return Err(TokenError::ContractPaused);
        }
        Ok(())
    }

    /// Balance of `from` after removing `amount`, without writing it
    fn checked_debit(&self, from: &Address, amount: &Amount) -> TokenResult<Amount> {
        let available = self.balance_of(from);
        available.checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientBalance {
                required: amount.clone(),
                available: available.clone(),
            })
    }

    fn credit(&mut self, to: Address, amount: &Amount) {
        let balance = self.balance_of(&to) + amount.clone();
        self.balances.insert(to, balance);

        let received = self.received_volume(&to) + amount.clone();
        self.received.insert(to, received);
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: &Amount) -> TokenResult<()> {
        let remaining = self.checked_debit(&from, amount)?;
        self.balances.insert(from, remaining);
        self.credit(to, amount);

        tracing::debug!("Transferred {} from {} to {}", amount, from, to);
        Ok(())
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.entry(owner).or_default().insert(spender, amount);
    }
}
