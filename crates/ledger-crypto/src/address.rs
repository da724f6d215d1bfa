// ledger-crypto/src/address.rs

use crate::{hash::Hashable, CryptoError, CryptoResult};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Address size in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Account or contract identity on the ledger
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn zero() -> Self {
        Self([0u8; ADDRESS_SIZE])
    }

    /// Derive a stable address from a human-readable account label.
    ///
    /// Operators refer to accounts such as `treasury` or `alice` by name; the
    /// address is the last 20 bytes of the label's SHA-256 digest.
    pub fn from_label(label: &str) -> Self {
        let hash = label.hash();
        let mut address = [0u8; ADDRESS_SIZE];
        address.copy_from_slice(&hash.as_bytes()[12..32]);
        Self(address)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != ADDRESS_SIZE {
            return Err(CryptoError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ADDRESS_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; ADDRESS_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// Address of the contract a deployer creates with the given nonce.
///
/// Same shape as CREATE: digest of deployer bytes followed by the
/// little-endian nonce, truncated to the last 20 bytes.
pub fn contract_address(deployer: &Address, nonce: u64) -> Address {
    let mut data = Vec::with_capacity(ADDRESS_SIZE + 8);
    data.extend_from_slice(deployer.as_bytes());
    data.extend_from_slice(&nonce.to_le_bytes());

    let hash = data.as_slice().hash();
    let mut address_bytes = [0u8; ADDRESS_SIZE];
    address_bytes.copy_from_slice(&hash.as_bytes()[12..32]);
    Address::new(address_bytes)
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Hex strings in human-readable formats (JSON, TOML) so addresses can key
// maps there; raw bytes for bincode.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(de::Error::custom)
        } else {
            let bytes = <[u8; ADDRESS_SIZE]>::deserialize(deserializer)?;
            Ok(Address(bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex() {
        let address = Address::from_label("carol");
        let parsed = Address::from_hex(&address.to_hex()).unwrap();
        assert_eq!(address, parsed);
        assert!(address.to_hex().starts_with("0x"));
    }

    #[test]
    fn test_invalid_length_rejected() {
        assert!(Address::from_hex("0x1234").is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_contract_address_depends_on_nonce() {
        let deployer = Address::from_label("factory");
        let first = contract_address(&deployer, 0);
        let second = contract_address(&deployer, 1);

        assert_ne!(first, second);
        assert_eq!(first, contract_address(&deployer, 0));
    }

    #[test]
    fn test_serde_formats() {
        let address = Address::from_label("dave");

        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);

        let bytes = bincode::serialize(&address).unwrap();
        assert_eq!(bytes.len(), ADDRESS_SIZE);
        let back: Address = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, address);
    }
}
