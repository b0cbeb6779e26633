//! Bridges the state machine's store and rotation context into the pool's
//! `TxChecker` capability (§9's "pass a capability instead of a
//! back-reference" resolution of the State↔Pool↔Executor cycle). The
//! checker keeps its own persistent sandbox, carried across calls via
//! `Sandbox::into_staged`/`with_staged` rather than holding a live
//! `Sandbox` (which would borrow the store for longer than one `check()`
//! call), and is reset whenever the pool rechecks after a commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use zarb_crypto::{Address, Hash, PublicKey};
use zarb_execution::{executors, Sandbox};
use zarb_pool::{PoolError, TxChecker};
use zarb_store::Store;
use zarb_types::{Account, Payload, Transaction, Validator};

struct Staged {
    accounts: HashMap<Address, Account>,
    validators: HashMap<Address, Validator>,
}

/// Speculative admission checker for pool transactions, run against the
/// latest committed state plus whatever earlier pool admissions have
/// staged on top of it this round.
pub struct StateChecker<S: Store> {
    store: S,
    staged: RwLock<Staged>,
    sortition_seed: RwLock<Hash>,
    total_stake: AtomicI64,
    next_validator_number: AtomicU32,
    height: RwLock<u64>,
}

impl<S: Store> StateChecker<S> {
    pub fn new(
        store: S,
        sortition_seed: Hash,
        total_stake: i64,
        next_validator_number: u32,
        height: u64,
    ) -> Self {
        StateChecker {
            store,
            staged: RwLock::new(Staged {
                accounts: HashMap::new(),
                validators: HashMap::new(),
            }),
            sortition_seed: RwLock::new(sortition_seed),
            total_stake: AtomicI64::new(total_stake),
            next_validator_number: AtomicU32::new(next_validator_number),
            height: RwLock::new(height),
        }
    }

    /// Called by the state machine immediately after a successful commit,
    /// before the pool's `recheck()` runs, so rechecked transactions are
    /// judged against the post-commit committee and height.
    pub async fn refresh(
        &self,
        sortition_seed: Hash,
        total_stake: i64,
        next_validator_number: u32,
        height: u64,
    ) {
        *self.sortition_seed.write().await = sortition_seed;
        self.total_stake.store(total_stake, Ordering::SeqCst);
        self.next_validator_number.store(next_validator_number, Ordering::SeqCst);
        *self.height.write().await = height;
    }
}

#[async_trait]
impl<S: Store> TxChecker for StateChecker<S> {
    async fn check(&self, tx: &Transaction) -> Result<(), PoolError> {
        let height = *self.height.read().await;
        let mut guard = self.staged.write().await;
        let mut sandbox = Sandbox::with_staged(
            &self.store,
            height + 1,
            guard.accounts.clone(),
            guard.validators.clone(),
        );

        match &tx.payload {
            Payload::Subsidy(_) => {
                return Err(PoolError::CheckFailed(
                    "subsidy transactions are proposer-only and never enter the pool".into(),
                ));
            }
            Payload::Send(payload) => {
                verify_signature(tx, &payload.sender_public_key)?;
                executors::execute_send(&mut sandbox, payload, tx.sequence, tx.fee)
                    .await
                    .map_err(checker_err)?;
            }
            Payload::Bond(payload) => {
                verify_signature(tx, &payload.bonder_public_key)?;
                let counter = &self.next_validator_number;
                executors::execute_bond(&mut sandbox, payload, tx.sequence, tx.fee, || {
                    counter.fetch_add(1, Ordering::SeqCst)
                })
                .await
                .map_err(checker_err)?;
            }
            Payload::Sortition(payload) => {
                let validator = sandbox
                    .validator(&payload.address)
                    .await
                    .map_err(checker_err)?
                    .ok_or_else(|| PoolError::CheckFailed("unknown validator".into()))?;
                verify_signature(tx, &validator.public_key)?;
                let seed = *self.sortition_seed.read().await;
                let total_stake = self.total_stake.load(Ordering::SeqCst);
                // Replay across distinct pool admissions in the same height
                // is not tracked here; only block application enforces it,
                // since the pool's speculative view is not the committed one.
                executors::execute_sortition(&mut sandbox, payload, tx.fee, seed, total_stake, |_| false)
                    .await
                    .map_err(checker_err)?;
            }
        }

        let (accounts, validators) = sandbox.into_staged();
        guard.accounts = accounts;
        guard.validators = validators;
        Ok(())
    }

    async fn reset(&self) {
        let mut guard = self.staged.write().await;
        guard.accounts.clear();
        guard.validators.clear();
    }
}

fn verify_signature(tx: &Transaction, public_key: &PublicKey) -> Result<(), PoolError> {
    let ok = tx
        .verify_signature(public_key)
        .map_err(|e| PoolError::CheckFailed(e.to_string()))?;
    if !ok {
        return Err(PoolError::CheckFailed("invalid signature".into()));
    }
    Ok(())
}

fn checker_err(e: zarb_execution::error::ExecutionError) -> PoolError {
    PoolError::CheckFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use zarb_crypto::SecretKey;
    use zarb_store::MemoryStore;
    use zarb_types::{Account as Acc, SendPayload};

    fn signed_send(sk: &SecretKey, sender: Address, receiver: Address, amount: i64, sequence: u32) -> Transaction {
        let payload = Payload::Send(SendPayload {
            sender,
            sender_public_key: sk.public_key(),
            receiver,
            amount,
        });
        let mut tx = Transaction::new(sequence, 1, payload, None);
        let bytes = tx.sign_bytes().unwrap();
        tx.signature = Some(sk.sign(&bytes));
        tx
    }

    #[tokio::test]
    async fn check_rejects_insufficient_balance_after_reset() {
        let store = MemoryStore::new();
        let sk = SecretKey::generate(&mut OsRng);
        let sender = Address::from_public_key(&sk.public_key());
        store.update_account(Acc::with_balance(sender, 100)).await.unwrap();

        let checker = StateChecker::new(store, Hash::zero(), 0, 0, 0);
        let tx = signed_send(&sk, sender, Address::new([2u8; 20]), 50, 1);
        checker.check(&tx).await.unwrap();

        // a later balance mutation outside the checker's staged view...
        checker.store.update_account(Acc::with_balance(sender, 10)).await.unwrap();
        checker.reset().await;

        let err = checker.check(&tx).await.unwrap_err();
        assert!(matches!(err, PoolError::CheckFailed(_)));
    }

    #[tokio::test]
    async fn subsidy_is_never_admitted() {
        let store = MemoryStore::new();
        let checker = StateChecker::new(store, Hash::zero(), 0, 0, 0);
        let tx = Transaction::new(
            0,
            0,
            Payload::Subsidy(zarb_types::SubsidyPayload {
                receiver: Address::treasury(),
                amount: 0,
            }),
            None,
        );
        assert!(checker.check(&tx).await.is_err());
    }
}
