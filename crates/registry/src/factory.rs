// registry/src/factory.rs

use crate::{Registry, RegistryError, RegistryResult};
use ledger_core::{AccessError, CallContext, ContractEvent, Log, Ownership};
use ledger_crypto::{contract_address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::marker::PhantomData;
use token::RewardToken;

/// Deploys registries of one variant, funds them from its own token balance
/// and partitions them into active and archived.
///
/// The factory only tracks addresses; the registries themselves live in the
/// ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RegistryFactory<R> {
    address: Address,
    ownership: Ownership,
    treasury: Address,
    nonce: u64,
    /// Creation order
    deployed: Vec<Address>,
    archived: HashSet<Address>,
    #[serde(skip)]
    _registry: PhantomData<R>,
}

impl<R: Registry> RegistryFactory<R> {
    pub fn new(address: Address, owner: Address, treasury: Address) -> Self {
        tracing::info!("{} factory deployed at {} (owner {})", R::KIND, address, owner);
        Self {
            address,
            ownership: Ownership::new(owner),
            treasury,
            nonce: 0,
            deployed: Vec::new(),
            archived: HashSet::new(),
            _registry: PhantomData,
        }
    }

    /// Address the next `create` will deploy to
    pub fn next_address(&self) -> Address {
        contract_address(&self.address, self.nonce)
    }

    /// Deploy a registry owned by the caller and fund it.
    ///
    /// Nothing is recorded if validation or funding fails.
    pub fn create(
        &mut self,
        ctx: &CallContext,
        config: R::Config,
        token: &mut RewardToken,
        logs: &mut Vec<Log>,
    ) -> RegistryResult<R> {
        let address = self.next_address();
        let registry = R::deploy(address, ctx.caller, config)?;

        let funding = registry.required_funding()?;
        if !funding.is_zero() {
            token.transfer(&self.address, address, &funding, logs)?;
        }

        self.nonce += 1;
        self.deployed.push(address);

        tracing::info!("{} factory {} created {} for {}", R::KIND, self.address, address, ctx.caller);
        logs.push(Log::new(
            self.address,
            ContractEvent::Deployed {
                registry: address,
                kind: R::KIND,
                creator: ctx.caller,
            },
        ));
        Ok(registry)
    }

    /// Move an active registry to the archived partition.
    ///
    /// Allowed for the factory owner and for the registry's creator.
    pub fn archive(
        &mut self,
        ctx: &CallContext,
        registry: Address,
        creator: Option<Address>,
        logs: &mut Vec<Log>,
    ) -> RegistryResult<()> {
        if !self.is_active(&registry) {
            return Err(RegistryError::RegistryNotFound(registry));
        }
        if !self.ownership.is_owner(&ctx.caller) && creator != Some(ctx.caller) {
            tracing::warn!("{} may not archive {}", ctx.caller, registry);
            return Err(AccessError::NotOwner { caller: ctx.caller }.into());
        }

        self.archived.insert(registry);

        tracing::info!("{} factory {} archived {}", R::KIND, self.address, registry);
        logs.push(Log::new(self.address, ContractEvent::Archived { registry }));
        Ok(())
    }

    pub fn is_active(&self, registry: &Address) -> bool {
        self.deployed.contains(registry) && !self.archived.contains(registry)
    }

    pub fn is_archived(&self, registry: &Address) -> bool {
        self.archived.contains(registry)
    }

    /// Active registries in creation order
    pub fn active(&self) -> Vec<Address> {
        self.deployed
            .iter()
            .filter(|a| !self.archived.contains(*a))
            .copied()
            .collect()
    }

    /// Archived registries in creation order
    pub fn inactive(&self) -> Vec<Address> {
        self.deployed
            .iter()
            .filter(|a| self.archived.contains(*a))
            .copied()
            .collect()
    }

    pub fn deployed(&self) -> &[Address] {
        &self.deployed
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    pub fn treasury(&self) -> Address {
        self.treasury
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventConfig, EventSignup, WelfareConfig, WelfareSignup};
    use ledger_core::{Amount, ErrorKind, RegistryKind};
    use token::TokenError;

    fn treasury() -> Address {
        Address::from_label("treasury")
    }

    fn owner() -> Address {
        Address::from_label("owner")
    }

    fn factory_address() -> Address {
        Address::from_label("event-factory")
    }

    fn event_config(name: &str) -> EventConfig {
        EventConfig {
            name: name.into(),
            description: "An amazing event".into(),
            max_capacity: 5,
            signup_start_time: 1_000,
            signup_end_time: 4_600,
            event_start_time: 8_200,
            event_end_time: 15_400,
            reward_cost: Amount::from_u64(10),
        }
    }

    /// Token with the factory holding 10_000
    fn setup() -> (RewardToken, RegistryFactory<EventSignup>) {
        let mut logs = Vec::new();
        let mut token = RewardToken::new(
            Address::from_label("token"),
            "Token",
            "SHR",
            treasury(),
            Amount::from_u64(100_000),
            &mut logs,
        );
        let factory = RegistryFactory::new(factory_address(), treasury(), token.treasury());
        token.transfer(&treasury(), factory.address(), &Amount::from_u64(10_000), &mut logs).unwrap();
        (token, factory)
    }

    #[test]
    fn test_treasury_matches_token() {
        let (token, factory) = setup();
        assert_eq!(factory.treasury(), token.treasury());
        assert_eq!(factory.owner(), treasury());
    }

    #[test]
    fn test_create_funds_registry() {
        let (mut token, mut factory) = setup();
        let mut logs = Vec::new();
        let ctx = CallContext::new(owner(), 1_000);
        let expected = factory.next_address();

        let event = factory.create(&ctx, event_config("Test Event"), &mut token, &mut logs).unwrap();

        assert_eq!(event.address(), expected);
        assert_eq!(event.creator(), owner());
        assert_eq!(factory.active(), vec![expected]);
        assert_eq!(token.balance_of(&expected), Amount::from_u64(50));
        assert_eq!(token.balance_of(&factory.address()), Amount::from_u64(9_950));
        assert_eq!(
            logs.last().map(|l| &l.event),
            Some(&ContractEvent::Deployed {
                registry: expected,
                kind: RegistryKind::Event,
                creator: owner(),
            })
        );
        assert_ne!(factory.next_address(), expected);
    }

    #[test]
    fn test_create_without_funds_records_nothing() {
        let (mut token, mut factory) = setup();
        let mut logs = Vec::new();
        let ctx = CallContext::new(owner(), 1_000);
        let expensive = EventConfig {
            reward_cost: Amount::from_u64(10_000),
            ..event_config("Expensive")
        };
        let next = factory.next_address();

        let result = factory.create(&ctx, expensive, &mut token, &mut logs);

        assert!(matches!(
            result,
            Err(RegistryError::Token(TokenError::InsufficientBalance { .. }))
        ));
        assert!(factory.deployed().is_empty());
        assert_eq!(factory.next_address(), next);
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let (mut token, mut factory) = setup();
        let mut logs = Vec::new();
        let bad = EventConfig { max_capacity: 0, ..event_config("Empty") };

        let err = factory.create(&CallContext::new(owner(), 0), bad, &mut token, &mut logs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(logs.is_empty());
    }

    #[test]
    fn test_archive_partitions() {
        let (mut token, mut factory) = setup();
        let mut logs = Vec::new();
        let ctx = CallContext::new(owner(), 1_000);
        let first = factory.create(&ctx, event_config("Event 1"), &mut token, &mut logs).unwrap();
        let second = factory.create(&ctx, event_config("Event 2"), &mut token, &mut logs).unwrap();
        let third = factory.create(&ctx, event_config("Event 3"), &mut token, &mut logs).unwrap();

        factory
            .archive(&ctx, second.address(), Some(second.creator()), &mut logs)
            .unwrap();

        assert_eq!(factory.active(), vec![first.address(), third.address()]);
        assert_eq!(factory.inactive(), vec![second.address()]);
        assert!(factory.is_archived(&second.address()));
    }

    #[test]
    fn test_archive_unknown_or_archived() {
        let (mut token, mut factory) = setup();
        let mut logs = Vec::new();
        let ctx = CallContext::new(treasury(), 1_000);

        let unknown = Address::from_label("unknown");
        assert_eq!(
            factory.archive(&ctx, unknown, None, &mut logs),
            Err(RegistryError::RegistryNotFound(unknown))
        );

        let event = factory.create(&ctx, event_config("Once"), &mut token, &mut logs).unwrap();
        factory.archive(&ctx, event.address(), Some(treasury()), &mut logs).unwrap();
        let again = factory.archive(&ctx, event.address(), Some(treasury()), &mut logs);
        assert_eq!(again.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_archive_requires_owner_or_creator() {
        let (mut token, mut factory) = setup();
        let mut logs = Vec::new();
        let event = factory
            .create(&CallContext::new(owner(), 1_000), event_config("Mine"), &mut token, &mut logs)
            .unwrap();
        let stranger = CallContext::new(Address::from_label("attendee1"), 1_000);

        let err = factory
            .archive(&stranger, event.address(), Some(event.creator()), &mut logs)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(factory.active(), vec![event.address()]);

        // factory owner may archive registries it did not create
        let admin = CallContext::new(treasury(), 1_000);
        assert!(factory.archive(&admin, event.address(), Some(event.creator()), &mut logs).is_ok());
    }

    #[test]
    fn test_welfare_factory_needs_no_funding() {
        let (mut token, _) = setup();
        let mut factory: RegistryFactory<WelfareSignup> =
            RegistryFactory::new(Address::from_label("welfare-factory"), treasury(), treasury());
        let mut logs = Vec::new();
        let config = WelfareConfig {
            name: "Food bank".into(),
            description: String::new(),
            max_capacity: 3,
            signup_start_time: 60,
            signup_end_time: 120,
            redemption_end_time: 180,
            redemption_cost: Amount::from_u64(2),
        };

        let welfare = factory.create(&CallContext::new(owner(), 0), config, &mut token, &mut logs).unwrap();

        assert_eq!(token.balance_of(&welfare.address()), Amount::zero());
        assert_eq!(logs.len(), 1);
    }
}
