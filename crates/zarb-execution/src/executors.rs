use zarb_store::Store;
use zarb_types::{Account, BondPayload, SendPayload, SortitionPayload, SubsidyPayload, Validator};

use crate::config::MIN_FEE;
use crate::error::ExecutionError;
use crate::sandbox::Sandbox;

fn require_fee(fee: i64) -> Result<(), ExecutionError> {
    if fee < MIN_FEE {
        return Err(ExecutionError::FeeTooLow { fee, min_fee: MIN_FEE });
    }
    Ok(())
}

/// Sender must exist, `sender.sequence + 1 == tx.sequence`, and
/// `sender.balance >= amount + fee`. Debits the sender, credits the
/// receiver (creating it with sequence zero if unknown), and increments
/// the sender's sequence.
pub async fn execute_send<S: Store>(
    sandbox: &mut Sandbox<'_, S>,
    payload: &SendPayload,
    sequence: u32,
    fee: i64,
) -> Result<(), ExecutionError> {
    require_fee(fee)?;

    let mut sender = sandbox
        .account(&payload.sender)
        .await?
        .ok_or(ExecutionError::UnknownAccount)?;

    let expected = sender.sequence + 1;
    if expected != sequence {
        return Err(ExecutionError::InvalidSequence { expected, got: sequence });
    }

    let required = payload.amount + fee;
    if sender.balance < required {
        return Err(ExecutionError::InsufficientFunds {
            balance: sender.balance,
            required,
        });
    }

    sender.balance -= required;
    sender.sequence += 1;

    let mut receiver = sandbox
        .account(&payload.receiver)
        .await?
        .unwrap_or_else(|| Account::new(payload.receiver));
    receiver.balance += payload.amount;

    sandbox.update_account(sender);
    sandbox.update_account(receiver);
    Ok(())
}

/// Bonder must exist, sequence check, `bonder.balance >= stake + fee`. If
/// the validator does not yet exist it is created with
/// `bonding_height = sandbox.current_height()`. Debits the bonder and adds
/// to the validator's stake.
pub async fn execute_bond<S: Store>(
    sandbox: &mut Sandbox<'_, S>,
    payload: &BondPayload,
    sequence: u32,
    fee: i64,
    next_validator_number: impl FnOnce() -> u32,
) -> Result<(), ExecutionError> {
    require_fee(fee)?;

    let mut bonder = sandbox
        .account(&payload.bonder)
        .await?
        .ok_or(ExecutionError::UnknownAccount)?;

    let expected = bonder.sequence + 1;
    if expected != sequence {
        return Err(ExecutionError::InvalidSequence { expected, got: sequence });
    }

    let required = payload.stake + fee;
    if bonder.balance < required {
        return Err(ExecutionError::InsufficientFunds {
            balance: bonder.balance,
            required,
        });
    }

    let validator_address = zarb_crypto::Address::from_public_key(&payload.validator_public_key);
    let mut validator = match sandbox.validator(&validator_address).await? {
        Some(v) => v,
        None => Validator::new(
            next_validator_number(),
            payload.validator_public_key,
            payload.validator_vrf_public_key,
            sandbox.current_height() as u32,
        ),
    };
    validator.stake += payload.stake;

    bonder.balance -= required;
    bonder.sequence += 1;

    sandbox.update_account(bonder);
    sandbox.update_validator(validator);
    Ok(())
}

/// Verifies the VRF proof against the validator's VRF key and the given
/// sortition seed, then checks the output against a stake-weighted
/// lottery threshold. Rejects replay: a validator that already has a
/// pending join this height cannot submit a second Sortition transaction.
pub async fn execute_sortition<S: Store>(
    sandbox: &mut Sandbox<'_, S>,
    payload: &SortitionPayload,
    fee: i64,
    sortition_seed: zarb_crypto::Hash,
    total_stake: i64,
    already_joined_this_height: impl Fn(&zarb_crypto::Address) -> bool,
) -> Result<Validator, ExecutionError> {
    require_fee(fee)?;

    let validator = sandbox
        .validator(&payload.address)
        .await?
        .ok_or(ExecutionError::UnknownAccount)?;

    if already_joined_this_height(&payload.address) {
        return Err(ExecutionError::SortitionReplay);
    }

    let output = validator
        .vrf_public_key
        .verify(sortition_seed.as_ref(), &payload.proof)
        .map_err(|_| ExecutionError::InvalidSortitionProof)?;

    if !passes_lottery_threshold(&output, validator.stake, total_stake) {
        return Err(ExecutionError::InvalidSortitionProof);
    }

    Ok(validator)
}

/// Single-ticket proportional lottery: a validator with share `stake /
/// total_stake` of the network wins if its VRF output, read as a 64-bit
/// big-endian integer, falls in the bottom `share` fraction of the output
/// space.
fn passes_lottery_threshold(output: &[u8; 32], stake: i64, total_stake: i64) -> bool {
    if total_stake <= 0 || stake <= 0 {
        return false;
    }
    let mut value_bytes = [0u8; 8];
    value_bytes.copy_from_slice(&output[..8]);
    let value = u64::from_be_bytes(value_bytes);
    let threshold = ((stake as u128) * (u64::MAX as u128) / (total_stake as u128)) as u64;
    value <= threshold
}

/// Must be the first transaction of the block, fee zero, no signer, and
/// `amount == block_reward + accumulated_fees_of_this_block`.
pub async fn execute_subsidy<S: Store>(
    sandbox: &mut Sandbox<'_, S>,
    payload: &SubsidyPayload,
    is_first_in_block: bool,
    fee: i64,
    expected_amount: i64,
) -> Result<(), ExecutionError> {
    if !is_first_in_block {
        return Err(ExecutionError::DuplicatedMintbase);
    }
    if fee != 0 {
        return Err(ExecutionError::FeeTooLow { fee, min_fee: 0 });
    }
    if payload.amount != expected_amount {
        return Err(ExecutionError::InvalidSubsidyAmount {
            expected: expected_amount,
            got: payload.amount,
        });
    }

    let mut receiver = sandbox
        .account(&payload.receiver)
        .await?
        .unwrap_or_else(|| Account::new(payload.receiver));
    receiver.balance += payload.amount;
    sandbox.update_account(receiver);
    Ok(())
}
