// storage/src/db.rs

use crate::{StorageError, StorageResult};
use ledger_core::LogRecord;
use ledger_crypto::Address;
use registry::{EventSignup, Ledger, LedgerSnapshot, Registry, RegistryFactory, WelfareSignup};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use token::RewardToken;

const SCHEMA_VERSION: u32 = 1;

const TOKEN_KEY: &[u8] = b"token";
const EVENT_FACTORY_KEY: &[u8] = b"event";
const WELFARE_FACTORY_KEY: &[u8] = b"welfare";
const SCHEMA_VERSION_KEY: &str = "schema_version";
const LOG_LENGTH_KEY: &str = "log_length";
const NONCES_KEY: &str = "nonces";

/// Column families for different data types
#[derive(Debug, Clone, Copy)]
pub enum ColumnFamily {
    Token,
    Events,
    Welfares,
    Factories,
    Logs,
    Meta,
}

impl ColumnFamily {
    fn as_str(&self) -> &'static str {
        match self {
            ColumnFamily::Token => "token",
            ColumnFamily::Events => "events",
            ColumnFamily::Welfares => "welfares",
            ColumnFamily::Factories => "factories",
            ColumnFamily::Logs => "logs",
            ColumnFamily::Meta => "meta",
        }
    }

    fn all() -> Vec<Self> {
        vec![
            Self::Token,
            Self::Events,
            Self::Welfares,
            Self::Factories,
            Self::Logs,
            Self::Meta,
        ]
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub create_if_missing: bool,
    pub max_open_files: i32,
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
            create_if_missing: true,
            max_open_files: 1024,
            write_buffer_size: 64 * 1024 * 1024, // 64 MB
            max_write_buffer_number: 3,
        }
    }
}

/// Row counts per column family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub events: u64,
    pub welfares: u64,
    pub log_records: u64,
    pub total_size_bytes: u64,
}

/// Persistent home of a ledger.
///
/// Registries are keyed by their 20-byte address, log records by big-endian
/// sequence number so iteration follows commit order. Values are bincode.
pub struct Database {
    db: Arc<DB>,
    config: DatabaseConfig,
}

impl Database {
    /// Open or create database
    pub fn open(config: DatabaseConfig) -> StorageResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.increase_parallelism(num_cpus::get() as i32);

        let cfs: Vec<_> = ColumnFamily::all().iter().map(|cf| cf.as_str()).collect();

        let db = DB::open_cf(&opts, &config.path, &cfs)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        tracing::info!("Database opened at {}", config.path);

        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    // ==================== LEDGER OPERATIONS ====================

    /// Persist the whole ledger in one atomic batch.
    ///
    /// Log records already on disk are not rewritten.
    pub fn save_ledger(&self, ledger: &Ledger) -> StorageResult<()> {
        let snapshot = ledger.snapshot();
        let persisted = self.log_length()?;
        if persisted > snapshot.records.len() as u64 {
            return Err(StorageError::Corruption(format!(
                "stored log has {} records, ledger only {}",
                persisted,
                snapshot.records.len()
            )));
        }

        let cf_token = self.cf(ColumnFamily::Token)?;
        let cf_events = self.cf(ColumnFamily::Events)?;
        let cf_welfares = self.cf(ColumnFamily::Welfares)?;
        let cf_factories = self.cf(ColumnFamily::Factories)?;
        let cf_logs = self.cf(ColumnFamily::Logs)?;
        let cf_meta = self.cf(ColumnFamily::Meta)?;

        let mut batch = WriteBatch::default();

        batch.put_cf(cf_token, TOKEN_KEY, encode(&snapshot.token)?);

        for event in &snapshot.events {
            batch.put_cf(cf_events, Registry::address(event).as_bytes(), encode(event)?);
        }
        for welfare in &snapshot.welfares {
            batch.put_cf(cf_welfares, Registry::address(welfare).as_bytes(), encode(welfare)?);
        }

        batch.put_cf(cf_factories, EVENT_FACTORY_KEY, encode(&snapshot.event_factory)?);
        batch.put_cf(cf_factories, WELFARE_FACTORY_KEY, encode(&snapshot.welfare_factory)?);

        let new_records = &snapshot.records[persisted as usize..];
        for record in new_records {
            batch.put_cf(cf_logs, record.sequence.to_be_bytes(), encode(record)?);
        }

        let log_length = snapshot.records.len() as u64;
        batch.put_cf(cf_meta, LOG_LENGTH_KEY.as_bytes(), log_length.to_be_bytes());
        batch.put_cf(cf_meta, NONCES_KEY.as_bytes(), encode(&snapshot.nonces)?);
        batch.put_cf(cf_meta, SCHEMA_VERSION_KEY.as_bytes(), SCHEMA_VERSION.to_be_bytes());

        self.db.write(batch)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        tracing::debug!(
            "Saved ledger: {} events, {} welfares, {} new log records",
            snapshot.events.len(),
            snapshot.welfares.len(),
            new_records.len()
        );
        Ok(())
    }

    /// Load the persisted ledger, or `None` for a fresh database
    pub fn load_ledger(&self) -> StorageResult<Option<Ledger>> {
        let cf_token = self.cf(ColumnFamily::Token)?;
        let token: RewardToken = match self.db.get_cf(cf_token, TOKEN_KEY)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
        {
            Some(bytes) => decode(&bytes)?,
            None => return Ok(None),
        };

        self.check_schema_version()?;

        let events: Vec<EventSignup> = self.load_all(ColumnFamily::Events)?;
        let welfares: Vec<WelfareSignup> = self.load_all(ColumnFamily::Welfares)?;
        let event_factory: RegistryFactory<EventSignup> = self.load_factory(EVENT_FACTORY_KEY)?;
        let welfare_factory: RegistryFactory<WelfareSignup> = self.load_factory(WELFARE_FACTORY_KEY)?;
        let records = self.load_logs_since(0)?;

        let nonces: Vec<(Address, u64)> = match self.get_meta(NONCES_KEY)? {
            Some(bytes) => decode(&bytes)?,
            None => Vec::new(),
        };

        let expected = self.log_length()?;
        if records.len() as u64 != expected {
            return Err(StorageError::Corruption(format!(
                "expected {} log records, found {}",
                expected,
                records.len()
            )));
        }

        let ledger = Ledger::restore(LedgerSnapshot {
            token,
            events,
            welfares,
            event_factory,
            welfare_factory,
            nonces,
            records,
        })
        .map_err(|e| StorageError::Corruption(e.to_string()))?;

        tracing::info!(
            "Loaded ledger with {} log records from {}",
            ledger.log().len(),
            self.config.path
        );
        Ok(Some(ledger))
    }

    /// Log records with `sequence >= from`, in commit order
    pub fn load_logs_since(&self, from: u64) -> StorageResult<Vec<LogRecord>> {
        let cf = self.cf(ColumnFamily::Logs)?;
        let start = from.to_be_bytes();
        let iter = self.db.iterator_cf(cf, IteratorMode::From(&start, Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (_key, value) = item.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            records.push(decode::<LogRecord>(&value)?);
        }
        Ok(records)
    }

    /// Number of log records on disk
    pub fn log_length(&self) -> StorageResult<u64> {
        match self.get_meta(LOG_LENGTH_KEY)? {
            Some(bytes) => {
                let length = u64::from_be_bytes(bytes.try_into()
                    .map_err(|_| StorageError::Corruption("Invalid log length".into()))?);
                Ok(length)
            }
            None => Ok(0),
        }
    }

    // ==================== METADATA OPERATIONS ====================

    /// Store metadata
    pub fn store_meta(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let cf = self.cf(ColumnFamily::Meta)?;
        self.db.put_cf(cf, key.as_bytes(), value)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    /// Get metadata
    pub fn get_meta(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let cf = self.cf(ColumnFamily::Meta)?;
        self.db.get_cf(cf, key.as_bytes())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    // ==================== UTILITY OPERATIONS ====================

    /// Compact database
    pub fn compact(&self) -> StorageResult<()> {
        tracing::info!("Compacting database...");

        for cf_type in ColumnFamily::all() {
            if let Ok(cf) = self.cf(cf_type) {
                self.db.compact_range_cf(cf, None::<&[u8]>, None::<&[u8]>);
            }
        }

        tracing::info!("Database compaction complete");
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> StorageResult<DatabaseStats> {
        let events = self.count(ColumnFamily::Events)?;
        let welfares = self.count(ColumnFamily::Welfares)?;

        let mut total_size = 0u64;
        if let Ok(metadata) = std::fs::metadata(&self.config.path) {
            total_size = metadata.len();
        }

        Ok(DatabaseStats {
            events,
            welfares,
            log_records: self.log_length()?,
            total_size_bytes: total_size,
        })
    }

    // ==================== HELPERS ====================

    fn cf(&self, cf_type: ColumnFamily) -> StorageResult<&rocksdb::ColumnFamily> {
        self.db.cf_handle(cf_type.as_str())
            .ok_or_else(|| StorageError::DatabaseError(format!("{} CF not found", cf_type.as_str())))
    }

    fn count(&self, cf_type: ColumnFamily) -> StorageResult<u64> {
        let cf = self.cf(cf_type)?;
        Ok(self.db.iterator_cf(cf, IteratorMode::Start).count() as u64)
    }

    fn load_all<T: DeserializeOwned>(&self, cf_type: ColumnFamily) -> StorageResult<Vec<T>> {
        let cf = self.cf(cf_type)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            values.push(decode(&value)?);
        }
        Ok(values)
    }

    fn load_factory<T: DeserializeOwned>(&self, key: &[u8]) -> StorageResult<T> {
        let cf = self.cf(ColumnFamily::Factories)?;
        let bytes = self.db.get_cf(cf, key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(format!("factory {}", String::from_utf8_lossy(key))))?;
        decode(&bytes)
    }

    fn check_schema_version(&self) -> StorageResult<()> {
        let bytes = self.get_meta(SCHEMA_VERSION_KEY)?
            .ok_or_else(|| StorageError::Corruption("missing schema version".into()))?;
        let version = u32::from_be_bytes(bytes.try_into()
            .map_err(|_| StorageError::Corruption("Invalid schema version".into()))?);
        if version != SCHEMA_VERSION {
            return Err(StorageError::Corruption(format!(
                "unsupported schema version {} (expected {})",
                version, SCHEMA_VERSION
            )));
        }
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    bincode::deserialize(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}
