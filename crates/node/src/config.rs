// node/src/config.rs
use ledger_core::{Amount, Timestamp};
use ledger_crypto::Address;
use registry::GenesisConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub data_dir: String,
    pub token: TokenConfig,
    pub factories: FactoryConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub initial_supply: u64,
    /// Hex address or label of the account holding supply and roles
    pub admin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Hex address or label
    pub owner: String,
    pub event_allocation: u64,
    pub welfare_allocation: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub max_open_files: i32,
    pub write_buffer_size_mb: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            token: TokenConfig {
                name: "ShearesToken".into(),
                symbol: "SHR".into(),
                initial_supply: 1_000_000,
                admin: "treasury".into(),
            },
            factories: FactoryConfig {
                owner: "treasury".into(),
                event_allocation: 100_000,
                welfare_allocation: 0,
            },
            storage: StorageConfig {
                max_open_files: 1024,
                write_buffer_size_mb: 64,
            },
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn db_path(&self) -> String {
        format!("{}/db", self.data_dir)
    }

    /// Genesis parameters for a fresh ledger created at `timestamp`
    pub fn genesis(&self, timestamp: Timestamp) -> anyhow::Result<GenesisConfig> {
        let allocated = self.factories.event_allocation.saturating_add(self.factories.welfare_allocation);
        if allocated > self.token.initial_supply {
            anyhow::bail!(
                "factory allocations exceed initial supply {}",
                self.token.initial_supply
            );
        }

        Ok(GenesisConfig {
            admin: resolve_account(&self.token.admin)?,
            token_name: self.token.name.clone(),
            token_symbol: self.token.symbol.clone(),
            initial_supply: Amount::from_u64(self.token.initial_supply),
            factory_owner: resolve_account(&self.factories.owner)?,
            event_allocation: Amount::from_u64(self.factories.event_allocation),
            welfare_allocation: Amount::from_u64(self.factories.welfare_allocation),
            timestamp,
        })
    }
}

/// `0x`-prefixed hex is taken literally, anything else is a label
pub fn resolve_account(account: &str) -> anyhow::Result<Address> {
    if account.starts_with("0x") {
        Ok(Address::from_hex(account)?)
    } else if account.is_empty() {
        anyhow::bail!("empty account")
    } else {
        Ok(Address::from_label(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = NodeConfig::default();
        config.factories.welfare_allocation = 500;
        config.to_file(path).unwrap();

        let loaded = NodeConfig::from_file(path).unwrap();
        assert_eq!(loaded.factories.welfare_allocation, 500);
        assert_eq!(loaded.token.symbol, "SHR");
    }

    #[test]
    fn test_genesis_from_default() {
        let genesis = NodeConfig::default().genesis(42).unwrap();
        assert_eq!(genesis.admin, Address::from_label("treasury"));
        assert_eq!(genesis.event_allocation, Amount::from_u64(100_000));
        assert_eq!(genesis.timestamp, 42);
    }

    #[test]
    fn test_genesis_rejects_overallocation() {
        let mut config = NodeConfig::default();
        config.factories.welfare_allocation = config.token.initial_supply;
        assert!(config.genesis(0).is_err());
    }

    #[test]
    fn test_resolve_account() {
        let alice = Address::from_label("alice");
        assert_eq!(resolve_account("alice").unwrap(), alice);
        assert_eq!(resolve_account(&alice.to_hex()).unwrap(), alice);
        assert!(resolve_account("0xzz").is_err());
        assert!(resolve_account("").is_err());
    }
}
