use serde::{Deserialize, Serialize};
use zarb_crypto::Hash;

use crate::cbor::to_canonical_bytes;
use crate::certificate::Certificate;
use crate::error::TypesError;

/// The state machine's exclusively-owned in-memory snapshot of where the
/// chain currently stands. Only `last_height` and `last_certificate` are
/// persisted (`PersistedLastInfo`); the rest is reconstructed from the last
/// committed block on restart (`zarb_state::restore`).
#[derive(Clone, Debug)]
pub struct LastInfo {
    pub last_height: u64,
    pub last_certificate: Option<Certificate>,
    pub last_block_hash: Hash,
    pub last_block_time: u64,
    pub last_sortition_seed: Hash,
    /// Commitment to the account/validator state as it stood *before* the
    /// next block is applied (`validate_block` check §4.3.2). There is no
    /// Merkle account tree in this core, so this is a running hash chain:
    /// `advance_state_hash(previous, new_block_hash, new_block_tx_ids_hash)`
    /// folded in at every commit, not a state root over individual accounts.
    pub state_hash: Hash,
    /// Hash standing in for the previous block's receipts (§4.3.3). Every
    /// transaction in a committed block succeeded by construction (a single
    /// failure aborts the whole block), so there is no per-tx success/failure
    /// data to differentiate; this reduces to the hash of that block's
    /// transaction-ID list.
    pub last_receipts_hash: Hash,
}

impl LastInfo {
    pub fn genesis(genesis_time: u64) -> Self {
        LastInfo {
            last_height: 0,
            last_certificate: None,
            last_block_hash: Hash::zero(),
            last_block_time: genesis_time,
            last_sortition_seed: Hash::zero(),
            state_hash: Hash::zero(),
            last_receipts_hash: Hash::zero(),
        }
    }

    /// The `{last_height, last_certificate}` pair written to
    /// `<datadir>/last_info.json` after every commit.
    pub fn to_persisted(&self) -> Result<PersistedLastInfo, TypesError> {
        let last_certificate = self
            .last_certificate
            .clone()
            .ok_or_else(|| TypesError::Encode("no certificate to persist before genesis".into()))?;
        Ok(PersistedLastInfo {
            last_height: self.last_height as i64,
            last_certificate,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedLastInfo {
    pub last_height: i64,
    pub last_certificate: Certificate,
}

impl PersistedLastInfo {
    pub fn to_cbor(&self) -> Result<Vec<u8>, TypesError> {
        crate::cbor::to_canonical_bytes(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, TypesError> {
        crate::cbor::from_canonical_bytes(bytes)
    }
}

#[derive(Serialize)]
struct StateHashView {
    previous: Hash,
    block_hash: Hash,
    tx_ids_hash: Hash,
}

/// Folds a newly committed block into the running state-hash chain: the
/// next `state_hash` a block must declare to pass `validate_block`.
pub fn advance_state_hash(previous: Hash, block_hash: Hash, tx_ids_hash: Hash) -> Result<Hash, TypesError> {
    Ok(zarb_crypto::hash(&to_canonical_bytes(&StateHashView {
        previous,
        block_hash,
        tx_ids_hash,
    })?))
}
