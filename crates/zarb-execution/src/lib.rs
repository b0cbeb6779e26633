//! Drives one block's worth of transaction execution: dispatches each
//! payload variant to its executor (§4.2), verifies signatures, and checks
//! the mandatory first Subsidy transaction against the block's pre-scanned
//! total fee.

pub mod config;
pub mod error;
pub mod executors;
pub mod sandbox;

use std::cell::Cell;
use std::collections::HashSet;

use zarb_crypto::{Address, Hash, PublicKey};
use zarb_store::Store;
use zarb_types::{Payload, Transaction, Validator};

use crate::config::BLOCK_REWARD;
use crate::error::ExecutionError;
pub use crate::sandbox::Sandbox;

/// Dispatches transactions one at a time against a single sandbox,
/// mirroring `execution/execution.go`'s `accumulatedFee` bookkeeping for
/// per-kind fee totals, plus a pre-scanned `expected_block_fee` the caller
/// computes over the block's non-Subsidy transactions before execution
/// starts — the mandatory Subsidy runs first, so it cannot be checked
/// against fees collected by transactions that haven't executed yet.
pub struct Executor<'s, S: Store> {
    sandbox: Sandbox<'s, S>,
    accumulated_fee: i64,
    expected_block_fee: i64,
    sortition_joiners: Vec<Validator>,
    joined_this_height: HashSet<Address>,
    next_validator_number: Cell<u32>,
    sortition_seed: Hash,
    total_stake: i64,
    tx_index: usize,
}

impl<'s, S: Store> Executor<'s, S> {
    /// `expected_block_fee` is the sum of the `fee` field declared by every
    /// non-Subsidy transaction in the block, pre-scanned before execution
    /// begins (§4.3 step 5's "two-pass" note) — the mandatory first Subsidy
    /// is checked against it directly rather than against
    /// `accumulated_fee`, which is always zero when the Subsidy runs first.
    pub fn new(
        sandbox: Sandbox<'s, S>,
        next_validator_number: u32,
        sortition_seed: Hash,
        total_stake: i64,
        expected_block_fee: i64,
    ) -> Self {
        Executor {
            sandbox,
            accumulated_fee: 0,
            expected_block_fee,
            sortition_joiners: Vec::new(),
            joined_this_height: HashSet::new(),
            next_validator_number: Cell::new(next_validator_number),
            sortition_seed,
            total_stake,
            tx_index: 0,
        }
    }

    /// Executes one transaction. The first call in a block must be the
    /// Subsidy; every call after the first treats the Subsidy kind as a
    /// duplicate and rejects it.
    pub async fn execute(&mut self, tx: &Transaction) -> Result<(), ExecutionError> {
        let is_first = self.tx_index == 0;
        self.tx_index += 1;

        match &tx.payload {
            Payload::Subsidy(payload) => {
                if tx.signature.is_some() {
                    return Err(ExecutionError::InvalidTxKindForContext);
                }
                let expected = BLOCK_REWARD + self.expected_block_fee;
                executors::execute_subsidy(&mut self.sandbox, payload, is_first, tx.fee, expected)
                    .await
            }
            Payload::Send(payload) => {
                self.verify_signer(tx, &payload.sender_public_key)?;
                executors::execute_send(&mut self.sandbox, payload, tx.sequence, tx.fee).await?;
                self.accumulated_fee += tx.fee;
                Ok(())
            }
            Payload::Bond(payload) => {
                self.verify_signer(tx, &payload.bonder_public_key)?;
                let cell = &self.next_validator_number;
                executors::execute_bond(&mut self.sandbox, payload, tx.sequence, tx.fee, || {
                    let number = cell.get();
                    cell.set(number + 1);
                    number
                })
                .await?;
                self.accumulated_fee += tx.fee;
                Ok(())
            }
            Payload::Sortition(payload) => {
                let validator = self
                    .sandbox
                    .validator(&payload.address)
                    .await?
                    .ok_or(ExecutionError::UnknownAccount)?;
                self.verify_signer(tx, &validator.public_key)?;

                let joined_this_height = &self.joined_this_height;
                let joined = executors::execute_sortition(
                    &mut self.sandbox,
                    payload,
                    tx.fee,
                    self.sortition_seed,
                    self.total_stake,
                    |addr| joined_this_height.contains(addr),
                )
                .await?;

                self.joined_this_height.insert(joined.address);
                self.sortition_joiners.push(joined);
                self.accumulated_fee += tx.fee;
                Ok(())
            }
        }
    }

    fn verify_signer(&self, tx: &Transaction, public_key: &PublicKey) -> Result<(), ExecutionError> {
        if !tx.verify_signature(public_key)? {
            return Err(ExecutionError::InvalidSignature);
        }
        Ok(())
    }

    pub fn accumulated_fee(&self) -> i64 {
        self.accumulated_fee
    }

    /// Validators that executed a winning Sortition transaction this
    /// block, in the order their transactions were processed — the
    /// candidate joiners for committee rotation (§4.5).
    pub fn sortition_joiners(&self) -> &[Validator] {
        &self.sortition_joiners
    }

    pub fn next_validator_number(&self) -> u32 {
        self.next_validator_number.get()
    }

    /// Flushes every staged mutation to the store. Only called once every
    /// transaction in the block has executed successfully.
    pub async fn commit(self) -> Result<(), ExecutionError> {
        self.sandbox.commit().await
    }
}
