// registry/src/event.rs

use crate::membership::Membership;
use crate::phase::check_signup_window;
use crate::{EventConfig, EventPhase, Registry, RegistryError, RegistryResult};
use ledger_core::{
    AccessError, Amount, CallContext, ContractEvent, Log, Ownership, RegistryKind, Timestamp,
};
use ledger_crypto::Address;
use serde::{Deserialize, Serialize};
use token::RewardToken;

/// Where check-in rewards are paid from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardSource {
    /// The registry's own token balance, funded at creation
    Escrow,
    /// An allowance the funder granted to the registry
    Allowance { funder: Address },
}

/// Snapshot of an Event registry's configuration and state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub address: Address,
    pub creator: Address,
    pub name: String,
    pub description: String,
    pub max_capacity: u32,
    pub signup_start_time: Timestamp,
    pub signup_end_time: Timestamp,
    pub event_start_time: Timestamp,
    pub event_end_time: Timestamp,
    pub reward_cost: Amount,
    pub is_active: bool,
    pub attendee_count: u32,
    pub checked_in_count: u32,
    pub reward_source: RewardSource,
}

/// Event registry: sign up in the signup window, check in during the event
/// and receive `reward_cost` tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSignup {
    address: Address,
    ownership: Ownership,
    config: EventConfig,
    active: bool,
    reward_source: RewardSource,
    /// Sign-up metadata per attendee; settled means checked in
    attendees: Membership<String>,
}

impl EventSignup {
    pub fn new(
        address: Address,
        creator: Address,
        config: EventConfig,
        reward_source: RewardSource,
    ) -> RegistryResult<Self> {
        config.validate()?;

        tracing::info!(
            "Event '{}' deployed at {} (capacity {}, reward {})",
            config.name, address, config.max_capacity, config.reward_cost
        );

        Ok(Self {
            address,
            ownership: Ownership::new(creator),
            attendees: Membership::new(config.max_capacity),
            config,
            active: true,
            reward_source,
        })
    }

    // ==================== MUTATIONS ====================

    pub fn sign_up(&mut self, ctx: &CallContext, metadata: String, logs: &mut Vec<Log>) -> RegistryResult<()> {
        if !self.active {
            return Err(RegistryError::NotActive);
        }
        check_signup_window(self.config.signup_start_time, self.config.signup_end_time, ctx.now)?;
        self.attendees.check_admission(&ctx.caller)?;

        self.attendees.admit(ctx.caller, metadata.clone());

        tracing::debug!("{} signed up for event {}", ctx.caller, self.address);
        logs.push(self.log(ContractEvent::SignedUp {
            participant: ctx.caller,
            metadata: Some(metadata),
        }));
        Ok(())
    }

    /// Check in during the event window and collect the reward
    pub fn check_in(
        &mut self,
        ctx: &CallContext,
        token: &mut RewardToken,
        logs: &mut Vec<Log>,
    ) -> RegistryResult<()> {
        if ctx.now < self.config.event_start_time {
            return Err(RegistryError::EventNotStarted);
        }
        if ctx.now > self.config.event_end_time {
            return Err(RegistryError::EventEnded);
        }
        self.attendees.require_member(&ctx.caller)?;
        if self.attendees.is_settled(&ctx.caller) {
            return Err(RegistryError::AlreadyCheckedIn);
        }

        self.pay_reward(ctx.caller, token, logs)?;
        self.attendees.settle(ctx.caller);

        tracing::debug!("{} checked in to event {}", ctx.caller, self.address);
        logs.push(self.log(ContractEvent::CheckedIn { participant: ctx.caller }));
        Ok(())
    }

    pub fn deactivate(&mut self, ctx: &CallContext, logs: &mut Vec<Log>) -> RegistryResult<()> {
        self.ownership.require_owner(&ctx.caller)?;

        self.active = false;
        tracing::info!("Event {} deactivated by {}", self.address, ctx.caller);
        logs.push(self.log(ContractEvent::Deactivated { by: ctx.caller }));
        Ok(())
    }

    fn pay_reward(&self, attendee: Address, token: &mut RewardToken, logs: &mut Vec<Log>) -> RegistryResult<()> {
        let reward = &self.config.reward_cost;
        if reward.is_zero() {
            return Ok(());
        }

        match self.reward_source {
            RewardSource::Escrow => token.transfer(&self.address, attendee, reward, logs)?,
            RewardSource::Allowance { funder } => {
                token.transfer_from(&self.address, funder, attendee, reward, logs)?
            }
        }
        Ok(())
    }

    // ==================== QUERIES ====================

    /// Metadata an attendee signed up with; visible to that attendee and the owner
    pub fn metadata_of(&self, ctx: &CallContext, attendee: &Address) -> RegistryResult<&str> {
        if ctx.caller != *attendee && !self.ownership.is_owner(&ctx.caller) {
            return Err(AccessError::NotOwner { caller: ctx.caller }.into());
        }
        self.attendees.require_member(attendee).map(String::as_str)
    }

    /// Every attendee's metadata in sign-up order (owner only)
    pub fn all_metadata(&self, ctx: &CallContext) -> RegistryResult<Vec<String>> {
        self.ownership.require_owner(&ctx.caller)?;
        Ok(self.attendees.iter().map(|(_, metadata)| metadata.clone()).collect())
    }

    pub fn details(&self) -> EventDetails {
        EventDetails {
            address: self.address,
            creator: self.ownership.owner(),
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            max_capacity: self.config.max_capacity,
            signup_start_time: self.config.signup_start_time,
            signup_end_time: self.config.signup_end_time,
            event_start_time: self.config.event_start_time,
            event_end_time: self.config.event_end_time,
            reward_cost: self.config.reward_cost.clone(),
            is_active: self.active,
            attendee_count: self.attendees.count(),
            checked_in_count: self.attendees.settled_count(),
            reward_source: self.reward_source,
        }
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn phase(&self, now: Timestamp) -> EventPhase {
        EventPhase::at(&self.config, now)
    }

    pub fn reward_source(&self) -> RewardSource {
        self.reward_source
    }

    pub fn is_attendee(&self, account: &Address) -> bool {
        self.attendees.contains(account)
    }

    pub fn has_checked_in(&self, account: &Address) -> bool {
        self.attendees.is_settled(account)
    }

    pub fn attendees(&self) -> &[Address] {
        self.attendees.members()
    }

    fn log(&self, event: ContractEvent) -> Log {
        Log::new(self.address, event)
    }
}

impl Registry for EventSignup {
    type Config = EventConfig;

    const KIND: RegistryKind = RegistryKind::Event;

    fn deploy(address: Address, creator: Address, config: EventConfig) -> RegistryResult<Self> {
        Self::new(address, creator, config, RewardSource::Escrow)
    }

    fn required_funding(&self) -> RegistryResult<Amount> {
        Ok(self.config.reward_budget())
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
        self.attendees.count()
    }
}
