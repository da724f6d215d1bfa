// node/src/runtime.rs
use crate::NodeConfig;
use ledger_core::{Receipt, Timestamp};
use registry::{Ledger, RegistryResult};
use std::sync::Arc;
use storage::{Database, DatabaseConfig};
use tokio::sync::RwLock;

/// Sequencer process: owns the ledger behind a lock and persists it after
/// every successful call.
///
/// Writers are serialized by the lock, so each call observes the state left
/// by the previous one.
pub struct Node {
    config: NodeConfig,
    ledger: Arc<RwLock<Ledger>>,
    database: Arc<Database>,
}

impl Node {
    /// Open the database and load the ledger, running genesis on first start
    pub fn open(config: NodeConfig) -> anyhow::Result<Self> {
        tracing::info!("Initializing node components");

        let db_config = DatabaseConfig {
            path: config.db_path(),
            max_open_files: config.storage.max_open_files,
            write_buffer_size: config.storage.write_buffer_size_mb * 1024 * 1024,
            ..Default::default()
        };
        let database = Arc::new(Database::open(db_config)?);

        let ledger = match database.load_ledger()? {
            Some(ledger) => {
                tracing::info!("✓ Ledger loaded: {} log records", ledger.log().len());
                ledger
            }
            None => {
                let (ledger, receipt) = Ledger::genesis(config.genesis(unix_timestamp())?)?;
                database.save_ledger(&ledger)?;
                tracing::info!(
                    "✓ Genesis complete: token {:?}, {} log records",
                    receipt.contract_address,
                    receipt.logs.len()
                );
                ledger
            }
        };

        Ok(Self {
            config,
            ledger: Arc::new(RwLock::new(ledger)),
            database,
        })
    }

    /// Run one mutating call and persist the result.
    ///
    /// The call runs against a copy of the ledger. A rejected call, or one
    /// whose result cannot be stored, leaves both memory and disk untouched.
    pub async fn execute<F>(&self, call: F) -> anyhow::Result<Receipt>
    where
        F: FnOnce(&mut Ledger) -> RegistryResult<Receipt>,
    {
        let mut ledger = self.ledger.write().await;
        let mut next = ledger.clone();
        let receipt = match call(&mut next) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!("Call rejected ({}): {}", e.kind(), e);
                return Err(e.into());
            }
        };

        // memory only moves forward once the store has the new state
        if let Err(e) = self.database.save_ledger(&next) {
            tracing::error!("Failed to persist ledger, call discarded: {}", e);
            return Err(e.into());
        }
        *ledger = next;
        tracing::debug!("Committed {} log records", receipt.logs.len());
        Ok(receipt)
    }

    /// Read-only access to the current state
    pub async fn query<T, F>(&self, read: F) -> T
    where
        F: FnOnce(&Ledger) -> T,
    {
        let ledger = self.ledger.read().await;
        read(&*ledger)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<RwLock<Ledger>> {
        &self.ledger
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }
}

/// Wall-clock time in unix seconds
pub fn unix_timestamp() -> Timestamp {
    chrono::Utc::now().timestamp().max(0) as Timestamp
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{Amount, CallContext};
    use ledger_crypto::Address;
    use registry::EventConfig;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> NodeConfig {
        NodeConfig {
            data_dir: dir.path().to_str().unwrap().to_string(),
            ..Default::default()
        }
    }

    fn event_config(capacity: u32) -> EventConfig {
        EventConfig {
            name: "Launch".into(),
            description: String::new(),
            max_capacity: capacity,
            signup_start_time: 100,
            signup_end_time: 200,
            event_start_time: 300,
            event_end_time: 400,
            reward_cost: Amount::from_u64(5),
        }
    }

    #[tokio::test]
    async fn test_genesis_on_first_open() {
        let dir = TempDir::new().unwrap();
        let node = Node::open(test_config(&dir)).unwrap();

        let balance = node
            .query(|ledger| {
                let factory = ledger.event_factory().address();
                ledger.token().balance_of(&factory)
            })
            .await;
        assert_eq!(balance, Amount::from_u64(100_000));
        assert!(node.database().log_length().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = TempDir::new().unwrap();
        let organiser = Address::from_label("organiser");
        let registry = {
            let node = Node::open(test_config(&dir)).unwrap();
            let receipt = node
                .execute(|ledger| ledger.create_event(&CallContext::new(organiser, 0), event_config(3)))
                .await
                .unwrap();
            receipt.contract_address.unwrap()
        };

        let node = Node::open(test_config(&dir)).unwrap();
        let active = node.query(|ledger| ledger.active_events()).await;
        assert_eq!(active, vec![registry]);
    }

    #[tokio::test]
    async fn test_rejected_call_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let node = Node::open(test_config(&dir)).unwrap();
        let before = node.database().log_length().unwrap();

        let result = node
            .execute(|ledger| ledger.create_event(&CallContext::new(Address::zero(), 0), event_config(0)))
            .await;

        assert!(result.is_err());
        assert_eq!(node.database().log_length().unwrap(), before);
    }

    #[tokio::test]
    async fn test_concurrent_sign_ups_respect_capacity() {
        let dir = TempDir::new().unwrap();
        let node = Arc::new(Node::open(test_config(&dir)).unwrap());
        let registry = node
            .execute(|ledger| ledger.create_event(&CallContext::new(Address::zero(), 0), event_config(3)))
            .await
            .unwrap()
            .contract_address
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let node = node.clone();
            handles.push(tokio::spawn(async move {
                let who = Address::from_label(&format!("attendee-{}", i));
                node.execute(|ledger| ledger.sign_up_event(&CallContext::new(who, 150), &registry, String::new()))
                    .await
                    .is_ok()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 3);
        let count = node
            .query(|ledger| ledger.event(&registry).map(|e| e.attendees().len()).unwrap_or(0))
            .await;
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_failed_save_discards_call() {
        let dir = TempDir::new().unwrap();
        let node = Node::open(test_config(&dir)).unwrap();
        let treasury = Address::from_label("treasury");
        let alice = Address::from_label("alice");

        // stored log claims more records than the ledger holds
        node.database().store_meta("log_length", &u64::MAX.to_be_bytes()).unwrap();

        let result = node
            .execute(|ledger| ledger.mint(&CallContext::new(treasury, 0), alice, &Amount::from_u64(500)))
            .await;

        assert!(result.is_err());
        let balance = node.query(|ledger| ledger.token().balance_of(&alice)).await;
        assert_eq!(balance, Amount::zero());
    }

    #[test]
    fn test_unix_timestamp() {
        assert!(unix_timestamp() > 1_000_000_000);
    }
}
