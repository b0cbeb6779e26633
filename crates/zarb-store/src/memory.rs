use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use zarb_crypto::{Address, Hash};
use zarb_types::{Account, Block, TxId, Transaction, Validator};

use crate::error::StoreError;
use crate::traits::{StoreReader, StoreWriter};

/// In-process reference store used as a test double throughout the
/// workspace; the real on-disk backend is an external collaborator.
#[derive(Default)]
pub struct MemoryStore {
    blocks: RwLock<HashMap<u64, Block>>,
    transactions: RwLock<HashMap<TxId, Transaction>>,
    accounts: RwLock<HashMap<Address, Account>>,
    validators_by_address: RwLock<HashMap<Address, Validator>>,
    validators_by_number: RwLock<HashMap<u32, Address>>,
    receipts: RwLock<HashMap<u64, Hash>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every transaction in `block` so later `transaction()` lookups
    /// succeed, mirroring the real store persisting a block's body
    /// alongside its header.
    pub async fn seed_transactions(&self, txs: Vec<Transaction>) -> Result<(), StoreError> {
        let mut guard = self.transactions.write().await;
        for tx in txs {
            let id = tx
                .id()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            guard.insert(id, tx);
        }
        Ok(())
    }
}

#[async_trait]
impl StoreReader for MemoryStore {
    async fn block(&self, height: u64) -> Result<Option<Block>, StoreError> {
        Ok(self.blocks.read().await.get(&height).cloned())
    }

    async fn transaction(&self, id: &TxId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.read().await.get(id).cloned())
    }

    async fn account(&self, address: &Address) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(address).cloned())
    }

    async fn validator(&self, address: &Address) -> Result<Option<Validator>, StoreError> {
        Ok(self.validators_by_address.read().await.get(address).cloned())
    }

    async fn validator_by_number(&self, number: u32) -> Result<Option<Validator>, StoreError> {
        let Some(address) = self.validators_by_number.read().await.get(&number).copied() else {
            return Ok(None);
        };
        self.validator(&address).await
    }
}

#[async_trait]
impl StoreWriter for MemoryStore {
    async fn update_account(&self, account: Account) -> Result<(), StoreError> {
        self.accounts.write().await.insert(account.address, account);
        Ok(())
    }

    async fn update_validator(&self, validator: Validator) -> Result<(), StoreError> {
        self.validators_by_number
            .write()
            .await
            .insert(validator.number, validator.address);
        self.validators_by_address
            .write()
            .await
            .insert(validator.address, validator);
        Ok(())
    }

    async fn save_block(&self, height: u64, block: Block) -> Result<(), StoreError> {
        self.blocks.write().await.insert(height, block);
        Ok(())
    }

    async fn save_receipts(&self, height: u64, receipts_hash: Hash) -> Result<(), StoreError> {
        self.receipts.write().await.insert(height, receipts_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_account_is_none() {
        let store = MemoryStore::new();
        assert!(store.account(&Address::treasury()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_then_read_account() {
        let store = MemoryStore::new();
        let acc = Account::with_balance(Address::treasury(), 500);
        store.update_account(acc.clone()).await.unwrap();
        let fetched = store.account(&Address::treasury()).await.unwrap().unwrap();
        assert_eq!(fetched.balance, 500);
    }

    #[tokio::test]
    async fn validator_by_number_resolves_through_address() {
        let store = MemoryStore::new();
        let sk = zarb_crypto::SecretKey::generate(&mut rand::rngs::OsRng);
        let vrf_pk = zarb_crypto::VrfKeypair::generate(&mut rand::rngs::OsRng).public();
        let validator = Validator::new(7, sk.public_key(), vrf_pk, 1);
        store.update_validator(validator.clone()).await.unwrap();
        let fetched = store.validator_by_number(7).await.unwrap().unwrap();
        assert_eq!(fetched.address, validator.address);
    }
}
