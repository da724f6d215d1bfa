// ledger-core/src/log.rs

use crate::{access::Role, Amount, CallContext, RegistryKind, Timestamp};
use ledger_crypto::Address;
use serde::{Deserialize, Serialize};

/// Structured notification emitted by a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    /// Token movement; `from` is `None` for mints, `to` is `None` for burns
    Transfer {
        from: Option<Address>,
        to: Option<Address>,
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
    RoleGranted {
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        sender: Address,
    },
    /// Event sign-ups carry metadata, welfare sign-ups do not
    SignedUp {
        participant: Address,
        metadata: Option<String>,
    },
    CheckedIn {
        participant: Address,
    },
    Redeemed {
        participant: Address,
    },
    Deactivated {
        by: Address,
    },
    Deployed {
        registry: Address,
        kind: RegistryKind,
        creator: Address,
    },
    Archived {
        registry: Address,
    },
}

impl ContractEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ContractEvent::Transfer { .. } => "Transfer",
            ContractEvent::Approval { .. } => "Approval",
            ContractEvent::Paused { .. } => "Paused",
            ContractEvent::Unpaused { .. } => "Unpaused",
            ContractEvent::RoleGranted { .. } => "RoleGranted",
            ContractEvent::RoleRevoked { .. } => "RoleRevoked",
            ContractEvent::SignedUp { .. } => "SignedUp",
            ContractEvent::CheckedIn { .. } => "CheckedIn",
            ContractEvent::Redeemed { .. } => "Redeemed",
            ContractEvent::Deactivated { .. } => "Deactivated",
            ContractEvent::Deployed { .. } => "Deployed",
            ContractEvent::Archived { .. } => "Archived",
        }
    }
}

/// An event together with the contract that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub event: ContractEvent,
}

impl Log {
    pub fn new(address: Address, event: ContractEvent) -> Self {
        Self { address, event }
    }
}

/// A committed log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Position in commit order, starting at 0
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub caller: Address,
    pub log: Log,
}

/// Append-only record of every committed event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<LogRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted records.
    ///
    /// Records must be contiguous from sequence 0; anything else is rejected.
    pub fn from_records(records: Vec<LogRecord>) -> Option<Self> {
        let contiguous = records
            .iter()
            .enumerate()
            .all(|(i, r)| r.sequence == i as u64);
        contiguous.then_some(Self { records })
    }

    /// Commit the logs of one successful call, returning the committed records
    pub fn append(&mut self, ctx: &CallContext, logs: Vec<Log>) -> Vec<LogRecord> {
        let start = self.records.len();
        for log in logs {
            let record = LogRecord {
                sequence: self.records.len() as u64,
                timestamp: ctx.now,
                caller: ctx.caller,
                log,
            };
            self.records.push(record);
        }
        self.records[start..].to_vec()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// Records with `sequence >= from`
    pub fn since(&self, from: u64) -> &[LogRecord] {
        let start = (from as usize).min(self.records.len());
        &self.records[start..]
    }

    /// Records emitted by one contract, in commit order
    pub fn emitted_by<'a>(&'a self, address: &'a Address) -> impl Iterator<Item = &'a LogRecord> + 'a {
        self.records.iter().filter(move |r| r.log.address == *address)
    }
}

/// Outcome of a successful call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub caller: Address,
    pub timestamp: Timestamp,
    /// Address of the contract created by this call, if any
    pub contract_address: Option<Address>,
    pub logs: Vec<LogRecord>,
}

impl Receipt {
    pub fn new(ctx: &CallContext, logs: Vec<LogRecord>) -> Self {
        Self {
            caller: ctx.caller,
            timestamp: ctx.now,
            contract_address: None,
            logs,
        }
    }

    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }

    pub fn events(&self) -> impl Iterator<Item = &ContractEvent> {
        self.logs.iter().map(|r| &r.log.event)
    }

    /// First event with the given name
    pub fn find(&self, name: &str) -> Option<&ContractEvent> {
        self.events().find(|e| e.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_up(label: &str) -> ContractEvent {
        ContractEvent::SignedUp {
            participant: Address::from_label(label),
            metadata: None,
        }
    }

    #[test]
    fn test_append_assigns_sequences() {
        let registry = Address::from_label("registry");
        let ctx = CallContext::new(Address::from_label("alice"), 10);
        let mut log = EventLog::new();

        let first = log.append(&ctx, vec![Log::new(registry, signed_up("alice"))]);
        let second = log.append(
            &ctx.at(11),
            vec![
                Log::new(registry, signed_up("bob")),
                Log::new(registry, signed_up("carol")),
            ],
        );

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].sequence, 0);
        assert_eq!(second.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(second[0].timestamp, 11);
        assert_eq!(log.next_sequence(), 3);
        assert_eq!(log.since(2).len(), 1);
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn test_emitted_by_filters() {
        let a = Address::from_label("a");
        let b = Address::from_label("b");
        let ctx = CallContext::new(Address::zero(), 0);
        let mut log = EventLog::new();
        log.append(&ctx, vec![Log::new(a, signed_up("x")), Log::new(b, signed_up("y"))]);

        assert_eq!(log.emitted_by(&a).count(), 1);
        assert_eq!(log.emitted_by(&b).next().unwrap().sequence, 1);
    }

    #[test]
    fn test_from_records_requires_contiguity() {
        let ctx = CallContext::new(Address::zero(), 0);
        let mut log = EventLog::new();
        let records = log.append(
            &ctx,
            vec![Log::new(Address::zero(), signed_up("x")), Log::new(Address::zero(), signed_up("y"))],
        );

        assert_eq!(EventLog::from_records(records.clone()), Some(log));
        assert!(EventLog::from_records(records[1..].to_vec()).is_none());
    }

    #[test]
    fn test_receipt_find() {
        let ctx = CallContext::new(Address::zero(), 5);
        let mut log = EventLog::new();
        let records = log.append(&ctx, vec![Log::new(Address::zero(), signed_up("x"))]);
        let receipt = Receipt::new(&ctx, records);

        assert!(receipt.find("SignedUp").is_some());
        assert!(receipt.find("CheckedIn").is_none());
    }
}
