// registry/src/membership.rs

use crate::{RegistryError, RegistryResult};
use ledger_crypto::Address;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Capacity-bounded participant set with a per-member settled flag.
///
/// `V` is the payload stored with each member (sign-up metadata for events).
/// Settling is check-in for events and redemption for welfares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership<V> {
    capacity: u32,
    entries: HashMap<Address, V>,
    /// Sign-up order
    order: Vec<Address>,
    settled: HashSet<Address>,
}

impl<V> Membership<V> {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: Vec::new(),
            settled: HashSet::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn count(&self) -> u32 {
        self.order.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.capacity
    }

    pub fn contains(&self, participant: &Address) -> bool {
        self.entries.contains_key(participant)
    }

    pub fn get(&self, participant: &Address) -> Option<&V> {
        self.entries.get(participant)
    }

    pub fn is_settled(&self, participant: &Address) -> bool {
        self.settled.contains(participant)
    }

    pub fn settled_count(&self) -> u32 {
        self.settled.len() as u32
    }

    /// Capacity first, then duplicates
    pub fn check_admission(&self, participant: &Address) -> RegistryResult<()> {
        if self.is_full() {
            return Err(RegistryError::RegistryFull { capacity: self.capacity });
        }
        if self.contains(participant) {
            return Err(RegistryError::AlreadyRegistered);
        }
        Ok(())
    }

    /// Payload of a member, or `NotRegistered`
    pub fn require_member(&self, participant: &Address) -> RegistryResult<&V> {
        self.entries
            .get(participant)
            .ok_or(RegistryError::NotRegistered { participant: *participant })
    }

    /// Record a participant that passed `check_admission`
    pub fn admit(&mut self, participant: Address, value: V) {
        debug_assert!(!self.contains(&participant) && !self.is_full());
        self.entries.insert(participant, value);
        self.order.push(participant);
    }

    /// Returns false if the member was already settled
    pub fn settle(&mut self, participant: Address) -> bool {
        debug_assert!(self.contains(&participant));
        self.settled.insert(participant)
    }

    pub fn members(&self) -> &[Address] {
        &self.order
    }

    /// Members with their payloads in sign-up order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &V)> {
        self.order
            .iter()
            .filter_map(move |addr| self.entries.get(addr).map(|v| (addr, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn test_admission_order_and_capacity() {
        let mut members = Membership::new(2);
        members.check_admission(&addr("alice")).unwrap();
        members.admit(addr("alice"), "first".to_string());
        members.check_admission(&addr("bob")).unwrap();
        members.admit(addr("bob"), "second".to_string());

        assert_eq!(members.count(), 2);
        assert_eq!(members.members(), &[addr("alice"), addr("bob")]);
        assert_eq!(
            members.check_admission(&addr("carol")),
            Err(RegistryError::RegistryFull { capacity: 2 })
        );

        let payloads: Vec<&String> = members.iter().map(|(_, v)| v).collect();
        assert_eq!(payloads, vec!["first", "second"]);
    }

    #[test]
    fn test_full_reported_before_duplicate() {
        let mut members = Membership::new(1);
        members.admit(addr("alice"), ());
        assert_eq!(
            members.check_admission(&addr("alice")),
            Err(RegistryError::RegistryFull { capacity: 1 })
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut members = Membership::new(5);
        members.admit(addr("alice"), ());
        assert_eq!(members.check_admission(&addr("alice")), Err(RegistryError::AlreadyRegistered));
    }

    #[test]
    fn test_settle_once() {
        let mut members = Membership::new(5);
        members.admit(addr("alice"), ());

        assert!(!members.is_settled(&addr("alice")));
        assert!(members.settle(addr("alice")));
        assert!(!members.settle(addr("alice")));
        assert_eq!(members.settled_count(), 1);
    }

    #[test]
    fn test_require_member() {
        let members: Membership<()> = Membership::new(5);
        assert_eq!(
            members.require_member(&addr("ghost")),
            Err(RegistryError::NotRegistered { participant: addr("ghost") })
        );
    }

    proptest! {
        #[test]
        fn prop_count_never_exceeds_capacity(
            capacity in 1u32..8,
            attempts in prop::collection::vec(0u8..12, 0..40),
        ) {
            let mut members = Membership::new(capacity);
            for id in attempts {
                let who = Address::from_label(&format!("user-{}", id));
                let before = members.count();
                match members.check_admission(&who) {
                    Ok(()) => members.admit(who, ()),
                    Err(_) => prop_assert_eq!(members.count(), before),
                }
                prop_assert!(members.count() <= capacity);
                prop_assert_eq!(members.count() as usize, members.members().len());
            }
        }
    }
}
