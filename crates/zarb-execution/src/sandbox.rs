use std::collections::HashMap;

use zarb_crypto::Address;
use zarb_store::{Store, StoreReader, StoreWriter};
use zarb_types::{Account, Validator};

use crate::error::ExecutionError;

/// A read-through, write-buffering view over a store for the duration of
/// one block's execution. Reads see staged writes immediately; nothing
/// reaches the store until `commit()`, and `reset()` discards everything
/// staged so far without touching it.
pub struct Sandbox<'s, S: Store> {
    store: &'s S,
    height: u64,
    accounts: HashMap<Address, Account>,
    validators: HashMap<Address, Validator>,
}

impl<'s, S: Store> Sandbox<'s, S> {
    pub fn new(store: &'s S, height: u64) -> Self {
        Sandbox {
            store,
            height,
            accounts: HashMap::new(),
            validators: HashMap::new(),
        }
    }

    /// Builds a sandbox pre-seeded with staged mutations carried over from
    /// an earlier sandbox, used by the pool's checker to accumulate state
    /// across admission checks without touching the store (§4.6).
    pub fn with_staged(
        store: &'s S,
        height: u64,
        accounts: HashMap<Address, Account>,
        validators: HashMap<Address, Validator>,
    ) -> Self {
        Sandbox {
            store,
            height,
            accounts,
            validators,
        }
    }

    /// Consumes the sandbox, returning its staged mutations so a caller
    /// can carry them into a later sandbox instead of committing them.
    pub fn into_staged(self) -> (HashMap<Address, Account>, HashMap<Address, Validator>) {
        (self.accounts, self.validators)
    }

    pub fn current_height(&self) -> u64 {
        self.height
    }

    pub async fn account(&self, address: &Address) -> Result<Option<Account>, ExecutionError> {
        if let Some(acc) = self.accounts.get(address) {
            return Ok(Some(acc.clone()));
        }
        Ok(self.store.account(address).await?)
    }

    pub async fn validator(&self, address: &Address) -> Result<Option<Validator>, ExecutionError> {
        if let Some(v) = self.validators.get(address) {
            return Ok(Some(v.clone()));
        }
        Ok(self.store.validator(address).await?)
    }

    pub fn update_account(&mut self, account: Account) {
        self.accounts.insert(account.address, account);
    }

    pub fn update_validator(&mut self, validator: Validator) {
        self.validators.insert(validator.address, validator);
    }

    /// Flush every staged mutation to the store. Only called once all of a
    /// block's transactions have executed successfully.
    pub async fn commit(self) -> Result<(), ExecutionError> {
        for account in self.accounts.into_values() {
            self.store.update_account(account).await?;
        }
        for validator in self.validators.into_values() {
            self.store.update_validator(validator).await?;
        }
        Ok(())
    }

    /// Discard every staged mutation. Used by the pool's recheck pass,
    /// which runs a disposable sandbox per candidate transaction.
    pub fn reset(&mut self) {
        self.accounts.clear();
        self.validators.clear();
    }
}
