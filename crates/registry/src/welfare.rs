// registry/src/welfare.rs

use crate::membership::Membership;
use crate::phase::check_signup_window;
use crate::{Registry, RegistryError, RegistryResult, WelfareConfig, WelfarePhase};
use ledger_core::{Amount, CallContext, ContractEvent, Log, Ownership, RegistryKind, Timestamp};
use ledger_crypto::Address;
use serde::{Deserialize, Serialize};
use token::RewardToken;

/// Snapshot of a Welfare registry's configuration and state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelfareDetails {
    pub address: Address,
    pub creator: Address,
    pub name: String,
    pub description: String,
    pub max_capacity: u32,
    pub signup_start_time: Timestamp,
    pub signup_end_time: Timestamp,
    pub redemption_end_time: Timestamp,
    pub redemption_cost: Amount,
    pub is_active: bool,
    pub attendee_count: u32,
    pub redeemed_count: u32,
}

/// Welfare registry: participants pay `redemption_cost` when signing up and
/// redeem once before the redemption deadline. The cost is kept as a fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelfareSignup {
    address: Address,
    ownership: Ownership,
    config: WelfareConfig,
    active: bool,
    /// Settled means redeemed
    participants: Membership<()>,
}

impl WelfareSignup {
    pub fn new(address: Address, creator: Address, config: WelfareConfig) -> RegistryResult<Self> {
        config.validate()?;

        tracing::info!(
            "Welfare '{}' deployed at {} (capacity {}, cost {})",
            config.name, address, config.max_capacity, config.redemption_cost
        );

        Ok(Self {
            address,
            ownership: Ownership::new(creator),
            participants: Membership::new(config.max_capacity),
            config,
            active: true,
        })
    }

    /// Sign up and pay the redemption cost through the caller's allowance
    pub fn sign_up(
        &mut self,
        ctx: &CallContext,
        token: &mut RewardToken,
        logs: &mut Vec<Log>,
    ) -> RegistryResult<()> {
        if !self.active {
            return Err(RegistryError::NotActive);
        }
        check_signup_window(self.config.signup_start_time, self.config.signup_end_time, ctx.now)?;
        self.participants.check_admission(&ctx.caller)?;

        let cost = &self.config.redemption_cost;
        if !cost.is_zero() {
            token.transfer_from(&self.address, ctx.caller, self.address, cost, logs)?;
        }
        self.participants.admit(ctx.caller, ());

        tracing::debug!("{} signed up for welfare {}", ctx.caller, self.address);
        logs.push(self.log(ContractEvent::SignedUp {
            participant: ctx.caller,
            metadata: None,
        }));
        Ok(())
    }

    pub fn redeem(&mut self, ctx: &CallContext, logs: &mut Vec<Log>) -> RegistryResult<()> {
        if ctx.now > self.config.redemption_end_time {
            return Err(RegistryError::RedemptionEnded);
        }
        self.participants.require_member(&ctx.caller)?;
        if !self.participants.settle(ctx.caller) {
            return Err(RegistryError::AlreadyRedeemed);
        }

        tracing::debug!("{} redeemed welfare {}", ctx.caller, self.address);
        logs.push(self.log(ContractEvent::Redeemed { participant: ctx.caller }));
        Ok(())
    }

    pub fn deactivate(&mut self, ctx: &CallContext, logs: &mut Vec<Log>) -> RegistryResult<()> {
        self.ownership.require_owner(&ctx.caller)?;

        self.active = false;
        tracing::info!("Welfare {} deactivated by {}", self.address, ctx.caller);
        logs.push(self.log(ContractEvent::Deactivated { by: ctx.caller }));
        Ok(())
    }

    pub fn details(&self) -> WelfareDetails {
        WelfareDetails {
            address: self.address,
            creator: self.ownership.owner(),
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            max_capacity: self.config.max_capacity,
            signup_start_time: self.config.signup_start_time,
            signup_end_time: self.config.signup_end_time,
            redemption_end_time: self.config.redemption_end_time,
            redemption_cost: self.config.redemption_cost.clone(),
            is_active: self.active,
            attendee_count: self.participants.count(),
            redeemed_count: self.participants.settled_count(),
        }
    }

    pub fn config(&self) -> &WelfareConfig {
        &self.config
    }

    pub fn phase(&self, now: Timestamp) -> WelfarePhase {
        WelfarePhase::at(&self.config, now)
    }

    pub fn is_attendee(&self, account: &Address) -> bool {
        self.participants.contains(account)
    }

    pub fn has_redeemed(&self, account: &Address) -> bool {
        self.participants.is_settled(account)
    }

    pub fn attendees(&self) -> &[Address] {
        self.participants.members()
    }

    fn log(&self, event: ContractEvent) -> Log {
        Log::new(self.address, event)
    }
}

impl Registry for WelfareSignup {
    type Config = WelfareConfig;

    const KIND: RegistryKind = RegistryKind::Welfare;

    fn deploy(address: Address, creator: Address, config: WelfareConfig) -> RegistryResult<Self> {
        Self::new(address, creator, config)
    }

    /// Welfares collect tokens rather than pay them out
    fn required_funding(&self) -> RegistryResult<Amount> {
        Ok(Amount::zero())
    }

    fn address(&self) -> Address {
        self.address
    }

    fn creator(&self) -> Address {
        self.ownership.owner()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn attendee_count(&self) -> u32 {
        self.participants.count()
    }
}
