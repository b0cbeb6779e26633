use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zarb_crypto::{Address, Hash, PublicKey};

use crate::error::TypesError;

pub const MAINNET_CHAIN_NAME: &str = "zarb-mainnet";
pub const TESTNET_CHAIN_NAME: &str = "zarb-testnet";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    pub balance: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub address: Address,
    pub stake: i64,
    pub public_key: PublicKey,
}

/// The chain's founding document: its name, birth time, and initial
/// accounts/validators. Loaded and saved as plain JSON so operators can
/// read and diff it directly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genesis {
    pub chain_name: String,
    pub genesis_time: DateTime<Utc>,
    pub accounts: Vec<GenesisAccount>,
    pub validators: Vec<GenesisValidator>,
}

impl Genesis {
    pub fn is_for_mainnet(&self) -> bool {
        self.chain_name == MAINNET_CHAIN_NAME
    }

    pub fn is_for_testnet(&self) -> bool {
        self.chain_name == TESTNET_CHAIN_NAME
    }

    pub fn is_for_test(&self) -> bool {
        !self.is_for_mainnet() && !self.is_for_testnet()
    }

    /// Hash of the canonical JSON encoding — deliberately JSON, not CBOR,
    /// matching the upstream genesis format this chain_id scheme was
    /// recovered from.
    pub fn hash(&self) -> Result<Hash, TypesError> {
        let json = serde_json::to_vec(self)?;
        Ok(zarb_crypto::hash(&json))
    }

    /// `chain_id = chain_name ‖ hex(genesis_hash[:3])`, used for replay
    /// protection across chains sharing the same transaction format.
    pub fn chain_id(&self) -> Result<String, TypesError> {
        let hash = self.hash()?;
        let prefix = hex::encode(&hash.as_bytes()[..3]);
        Ok(format!("{}{}", self.chain_name, prefix))
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Self, TypesError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), TypesError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use zarb_crypto::SecretKey;

    fn sample_genesis(chain_name: &str) -> Genesis {
        let pk = SecretKey::generate(&mut OsRng).public_key();
        Genesis {
            chain_name: chain_name.to_string(),
            genesis_time: "2020-01-01T00:00:00Z".parse().unwrap(),
            accounts: vec![GenesisAccount {
                address: Address::treasury(),
                balance: 1000,
            }],
            validators: vec![GenesisValidator {
                address: Address::from_public_key(&pk),
                stake: 100,
                public_key: pk,
            }],
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let g = sample_genesis("test");
        assert_eq!(g.hash().unwrap(), g.hash().unwrap());
    }

    #[test]
    fn chain_id_is_name_plus_hash_prefix() {
        let g = sample_genesis("test");
        let hash = g.hash().unwrap();
        let expected = format!("test{}", hex::encode(&hash.as_bytes()[..3]));
        assert_eq!(g.chain_id().unwrap(), expected);
    }

    #[test]
    fn chain_classification() {
        assert!(sample_genesis(MAINNET_CHAIN_NAME).is_for_mainnet());
        assert!(sample_genesis(TESTNET_CHAIN_NAME).is_for_testnet());
        assert!(sample_genesis("test").is_for_test());
    }
}
