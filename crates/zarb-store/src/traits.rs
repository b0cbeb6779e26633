use async_trait::async_trait;
use zarb_crypto::Address;
use zarb_types::{Account, Block, TxId, Transaction, Validator};

use crate::error::StoreError;

/// Read-only access to persisted chain state. Implemented by the on-disk
/// store (an external collaborator, out of scope here) and by
/// `MemoryStore` for tests.
#[async_trait]
pub trait StoreReader: Send + Sync {
    async fn block(&self, height: u64) -> Result<Option<Block>, StoreError>;
    async fn transaction(&self, id: &TxId) -> Result<Option<Transaction>, StoreError>;
    async fn account(&self, address: &Address) -> Result<Option<Account>, StoreError>;
    async fn validator(&self, address: &Address) -> Result<Option<Validator>, StoreError>;
    async fn validator_by_number(&self, number: u32) -> Result<Option<Validator>, StoreError>;
}

/// Mutating access, used only from within a single atomic commit scope in
/// `apply_block`. A `StoreWriter` must make every call within one commit
/// all-or-nothing from the caller's point of view.
#[async_trait]
pub trait StoreWriter: Send + Sync {
    async fn update_account(&self, account: Account) -> Result<(), StoreError>;
    async fn update_validator(&self, validator: Validator) -> Result<(), StoreError>;
    async fn save_block(&self, height: u64, block: Block) -> Result<(), StoreError>;
    async fn save_receipts(&self, height: u64, receipts_hash: zarb_crypto::Hash) -> Result<(), StoreError>;
}

pub trait Store: StoreReader + StoreWriter {}
impl<T: StoreReader + StoreWriter> Store for T {}

/// Lets the store be shared by `Arc` across the state machine (writer) and
/// the pool's checker capability (reader), rather than handing out `&S`
/// references tied to a single owner's lifetime.
#[async_trait]
impl<T: StoreReader + ?Sized> StoreReader for std::sync::Arc<T> {
    async fn block(&self, height: u64) -> Result<Option<Block>, StoreError> {
        (**self).block(height).await
    }
    async fn transaction(&self, id: &TxId) -> Result<Option<Transaction>, StoreError> {
        (**self).transaction(id).await
    }
    async fn account(&self, address: &Address) -> Result<Option<Account>, StoreError> {
        (**self).account(address).await
    }
    async fn validator(&self, address: &Address) -> Result<Option<Validator>, StoreError> {
        (**self).validator(address).await
    }
    async fn validator_by_number(&self, number: u32) -> Result<Option<Validator>, StoreError> {
        (**self).validator_by_number(number).await
    }
}

#[async_trait]
impl<T: StoreWriter + ?Sized> StoreWriter for std::sync::Arc<T> {
    async fn update_account(&self, account: Account) -> Result<(), StoreError> {
        (**self).update_account(account).await
    }
    async fn update_validator(&self, validator: Validator) -> Result<(), StoreError> {
        (**self).update_validator(validator).await
    }
    async fn save_block(&self, height: u64, block: Block) -> Result<(), StoreError> {
        (**self).save_block(height, block).await
    }
    async fn save_receipts(&self, height: u64, receipts_hash: zarb_crypto::Hash) -> Result<(), StoreError> {
        (**self).save_receipts(height, receipts_hash).await
    }
}
