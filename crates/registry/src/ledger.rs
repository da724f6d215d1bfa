// registry/src/ledger.rs

use crate::{
    EventConfig, EventSignup, Registry, RegistryError, RegistryFactory, RegistryResult,
    RewardSource, WelfareConfig, WelfareSignup,
};
use ledger_core::{
    Amount, CallContext, ContractEvent, EventLog, Log, LogRecord, Receipt, Role, Timestamp,
};
use ledger_crypto::{contract_address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use token::RewardToken;

/// Parameters of a fresh ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Receives the initial supply and every token role
    pub admin: Address,
    pub token_name: String,
    pub token_symbol: String,
    pub initial_supply: Amount,
    pub factory_owner: Address,
    /// Moved from the admin to the event factory at genesis
    pub event_allocation: Amount,
    pub welfare_allocation: Amount,
    pub timestamp: Timestamp,
}

/// Everything a ledger consists of, flattened for persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub token: RewardToken,
    pub events: Vec<EventSignup>,
    pub welfares: Vec<WelfareSignup>,
    pub event_factory: RegistryFactory<EventSignup>,
    pub welfare_factory: RegistryFactory<WelfareSignup>,
    pub nonces: Vec<(Address, u64)>,
    pub records: Vec<LogRecord>,
}

/// Single sequencer over the token, all registries and both factories.
///
/// Every mutation runs its checks first, then at most one fallible token
/// movement, then infallible bookkeeping. On success the emitted logs are
/// committed with increasing sequence numbers and returned in a `Receipt`;
/// on failure nothing changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    token: RewardToken,
    events: HashMap<Address, EventSignup>,
    welfares: HashMap<Address, WelfareSignup>,
    event_factory: RegistryFactory<EventSignup>,
    welfare_factory: RegistryFactory<WelfareSignup>,
    /// Deployment counters for direct deployments
    nonces: HashMap<Address, u64>,
    log: EventLog,
}

impl Ledger {
    /// Deploy the token and both factories, then fund the factories
    pub fn genesis(config: GenesisConfig) -> RegistryResult<(Self, Receipt)> {
        let ctx = CallContext::new(config.admin, config.timestamp);
        let mut nonces = HashMap::new();
        let mut logs = Vec::new();

        let token_address = bump_nonce(&mut nonces, config.admin);
        let mut token = RewardToken::new(
            token_address,
            config.token_name,
            config.token_symbol,
            config.admin,
            config.initial_supply,
            &mut logs,
        );

        let event_factory = RegistryFactory::new(
            bump_nonce(&mut nonces, config.factory_owner),
            config.factory_owner,
            token.treasury(),
        );
        let welfare_factory = RegistryFactory::new(
            bump_nonce(&mut nonces, config.factory_owner),
            config.factory_owner,
            token.treasury(),
        );

        for (factory, allocation) in [
            (event_factory.address(), &config.event_allocation),
            (welfare_factory.address(), &config.welfare_allocation),
        ] {
            if !allocation.is_zero() {
                token.transfer(&config.admin, factory, allocation, &mut logs)?;
            }
        }

        tracing::info!(
            "Genesis: token {} at {}, event factory {}, welfare factory {}",
            token.symbol(),
            token.address(),
            event_factory.address(),
            welfare_factory.address()
        );

        let mut ledger = Self {
            token,
            events: HashMap::new(),
            welfares: HashMap::new(),
            event_factory,
            welfare_factory,
            nonces,
            log: EventLog::new(),
        };
        let receipt = ledger.commit(&ctx, logs).with_contract_address(token_address);
        Ok((ledger, receipt))
    }

    /// Rebuild a ledger from persisted parts
    pub fn restore(snapshot: LedgerSnapshot) -> RegistryResult<Self> {
        let log = EventLog::from_records(snapshot.records).ok_or_else(|| {
            RegistryError::InvalidConfig("log records are not contiguous".into())
        })?;

        Ok(Self {
            token: snapshot.token,
            events: snapshot.events.into_iter().map(|e| (Registry::address(&e), e)).collect(),
            welfares: snapshot.welfares.into_iter().map(|w| (Registry::address(&w), w)).collect(),
            event_factory: snapshot.event_factory,
            welfare_factory: snapshot.welfare_factory,
            nonces: snapshot.nonces.into_iter().collect(),
            log,
        })
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut nonces: Vec<(Address, u64)> = self.nonces.iter().map(|(a, n)| (*a, *n)).collect();
        nonces.sort();

        LedgerSnapshot {
            token: self.token.clone(),
            events: self.events.values().cloned().collect(),
            welfares: self.welfares.values().cloned().collect(),
            event_factory: self.event_factory.clone(),
            welfare_factory: self.welfare_factory.clone(),
            nonces,
            records: self.log.records().to_vec(),
        }
    }

    // ==================== TOKEN ====================

    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: &Amount) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.transfer(&ctx.caller, to, amount, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: &Amount,
    ) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.transfer_from(&ctx.caller, from, to, amount, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn approve(&mut self, ctx: &CallContext, spender: Address, amount: &Amount) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.approve(&ctx.caller, spender, amount, &mut logs);
        Ok(self.commit(ctx, logs))
    }

    pub fn increase_allowance(
        &mut self,
        ctx: &CallContext,
        spender: Address,
        added: &Amount,
    ) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.increase_allowance(&ctx.caller, spender, added, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn decrease_allowance(
        &mut self,
        ctx: &CallContext,
        spender: Address,
        subtracted: &Amount,
    ) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.decrease_allowance(&ctx.caller, spender, subtracted, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn mint(&mut self, ctx: &CallContext, to: Address, amount: &Amount) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.mint(&ctx.caller, to, amount, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn burn(&mut self, ctx: &CallContext, from: Address, amount: &Amount) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.burn(&ctx.caller, from, amount, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn pause(&mut self, ctx: &CallContext) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.pause(&ctx.caller, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn unpause(&mut self, ctx: &CallContext) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.unpause(&ctx.caller, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn grant_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.grant_role(&ctx.caller, role, account, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn revoke_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.token.revoke_role(&ctx.caller, role, account, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    // ==================== EVENTS ====================

    /// Deploy a creator-owned event outside any factory. Rewards are pulled
    /// from the creator's allowance to the new registry.
    pub fn deploy_event(&mut self, ctx: &CallContext, config: EventConfig) -> RegistryResult<Receipt> {
        let address = self.next_direct_address(&ctx.caller);
        self.ensure_unused(&address)?;

        let event = EventSignup::new(
            address,
            ctx.caller,
            config,
            RewardSource::Allowance { funder: ctx.caller },
        )?;
        let logs = vec![deployed_log::<EventSignup>(address, ctx.caller)];

        bump_nonce(&mut self.nonces, ctx.caller);
        self.events.insert(address, event);
        Ok(self.commit(ctx, logs).with_contract_address(address))
    }

    /// Deploy and fund an event through the event factory
    pub fn create_event(&mut self, ctx: &CallContext, config: EventConfig) -> RegistryResult<Receipt> {
        let address = self.event_factory.next_address();
        self.ensure_unused(&address)?;

        let mut logs = Vec::new();
        let event = self.event_factory.create(ctx, config, &mut self.token, &mut logs)?;

        self.events.insert(address, event);
        Ok(self.commit(ctx, logs).with_contract_address(address))
    }

    pub fn sign_up_event(&mut self, ctx: &CallContext, registry: &Address, metadata: String) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.event_mut(registry)?.sign_up(ctx, metadata, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn check_in(&mut self, ctx: &CallContext, registry: &Address) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        let event = self
            .events
            .get_mut(registry)
            .ok_or(RegistryError::RegistryNotFound(*registry))?;
        event.check_in(ctx, &mut self.token, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn deactivate_event(&mut self, ctx: &CallContext, registry: &Address) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.event_mut(registry)?.deactivate(ctx, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn archive_event(&mut self, ctx: &CallContext, registry: &Address) -> RegistryResult<Receipt> {
        let creator = self.events.get(registry).map(Registry::creator);
        let mut logs = Vec::new();
        self.event_factory.archive(ctx, *registry, creator, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn event_metadata(&self, ctx: &CallContext, registry: &Address, attendee: &Address) -> RegistryResult<String> {
        self.event(registry)?.metadata_of(ctx, attendee).map(str::to_owned)
    }

    pub fn event_all_metadata(&self, ctx: &CallContext, registry: &Address) -> RegistryResult<Vec<String>> {
        self.event(registry)?.all_metadata(ctx)
    }

    // ==================== WELFARES ====================

    /// Deploy a creator-owned welfare outside any factory
    pub fn deploy_welfare(&mut self, ctx: &CallContext, config: WelfareConfig) -> RegistryResult<Receipt> {
        let address = self.next_direct_address(&ctx.caller);
        self.ensure_unused(&address)?;

        let welfare = WelfareSignup::new(address, ctx.caller, config)?;
        let logs = vec![deployed_log::<WelfareSignup>(address, ctx.caller)];

        bump_nonce(&mut self.nonces, ctx.caller);
        self.welfares.insert(address, welfare);
        Ok(self.commit(ctx, logs).with_contract_address(address))
    }

    pub fn create_welfare(&mut self, ctx: &CallContext, config: WelfareConfig) -> RegistryResult<Receipt> {
        let address = self.welfare_factory.next_address();
        self.ensure_unused(&address)?;

        let mut logs = Vec::new();
        let welfare = self.welfare_factory.create(ctx, config, &mut self.token, &mut logs)?;

        self.welfares.insert(address, welfare);
        Ok(self.commit(ctx, logs).with_contract_address(address))
    }

    pub fn sign_up_welfare(&mut self, ctx: &CallContext, registry: &Address) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        let welfare = self
            .welfares
            .get_mut(registry)
            .ok_or(RegistryError::RegistryNotFound(*registry))?;
        welfare.sign_up(ctx, &mut self.token, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn redeem(&mut self, ctx: &CallContext, registry: &Address) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.welfare_mut(registry)?.redeem(ctx, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn deactivate_welfare(&mut self, ctx: &CallContext, registry: &Address) -> RegistryResult<Receipt> {
        let mut logs = Vec::new();
        self.welfare_mut(registry)?.deactivate(ctx, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    pub fn archive_welfare(&mut self, ctx: &CallContext, registry: &Address) -> RegistryResult<Receipt> {
        let creator = self.welfares.get(registry).map(Registry::creator);
        let mut logs = Vec::new();
        self.welfare_factory.archive(ctx, *registry, creator, &mut logs)?;
        Ok(self.commit(ctx, logs))
    }

    // ==================== QUERIES ====================

    pub fn token(&self) -> &RewardToken {
        &self.token
    }

    pub fn event(&self, registry: &Address) -> RegistryResult<&EventSignup> {
        self.events.get(registry).ok_or(RegistryError::RegistryNotFound(*registry))
    }

    pub fn welfare(&self, registry: &Address) -> RegistryResult<&WelfareSignup> {
        self.welfares.get(registry).ok_or(RegistryError::RegistryNotFound(*registry))
    }

    pub fn event_factory(&self) -> &RegistryFactory<EventSignup> {
        &self.event_factory
    }

    pub fn welfare_factory(&self) -> &RegistryFactory<WelfareSignup> {
        &self.welfare_factory
    }

    pub fn active_events(&self) -> Vec<Address> {
        self.event_factory.active()
    }

    pub fn inactive_events(&self) -> Vec<Address> {
        self.event_factory.inactive()
    }

    pub fn active_welfares(&self) -> Vec<Address> {
        self.welfare_factory.active()
    }

    pub fn inactive_welfares(&self) -> Vec<Address> {
        self.welfare_factory.inactive()
    }

    /// Every event registry, factory-created or not
    pub fn events(&self) -> impl Iterator<Item = &EventSignup> {
        self.events.values()
    }

    pub fn welfares(&self) -> impl Iterator<Item = &WelfareSignup> {
        self.welfares.values()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    // ==================== INTERNALS ====================

    fn commit(&mut self, ctx: &CallContext, logs: Vec<Log>) -> Receipt {
        let records = self.log.append(ctx, logs);
        Receipt::new(ctx, records)
    }

    fn event_mut(&mut self, registry: &Address) -> RegistryResult<&mut EventSignup> {
        self.events.get_mut(registry).ok_or(RegistryError::RegistryNotFound(*registry))
    }

    fn welfare_mut(&mut self, registry: &Address) -> RegistryResult<&mut WelfareSignup> {
        self.welfares.get_mut(registry).ok_or(RegistryError::RegistryNotFound(*registry))
    }

    fn next_direct_address(&self, deployer: &Address) -> Address {
        contract_address(deployer, self.nonces.get(deployer).copied().unwrap_or(0))
    }

    fn ensure_unused(&self, address: &Address) -> RegistryResult<()> {
        let taken = self.events.contains_key(address)
            || self.welfares.contains_key(address)
            || *address == self.token.address()
            || *address == self.event_factory.address()
            || *address == self.welfare_factory.address();
        if taken {
            return Err(RegistryError::InvalidConfig(format!("address {} is already in use", address)));
        }
        Ok(())
    }
}

/// Next contract address for `deployer`, advancing its nonce
fn bump_nonce(nonces: &mut HashMap<Address, u64>, deployer: Address) -> Address {
    let nonce = nonces.entry(deployer).or_insert(0);
    let address = contract_address(&deployer, *nonce);
    *nonce += 1;
    address
}

fn deployed_log<R: Registry>(address: Address, creator: Address) -> Log {
    Log::new(
        address,
        ContractEvent::Deployed {
            registry: address,
            kind: R::KIND,
            creator,
        },
    )
}
