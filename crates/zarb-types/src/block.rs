use serde::{Deserialize, Serialize};
use zarb_crypto::{Address, Hash};

use crate::cbor::to_canonical_bytes;
use crate::certificate::Certificate;
use crate::error::TypesError;
use crate::transaction::TxId;

pub const BLOCK_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub time: u64,
    pub last_block_hash: Hash,
    pub state_hash: Hash,
    pub tx_ids_hash: Hash,
    pub last_receipts_hash: Hash,
    pub last_certificate_hash: Hash,
    /// Reflects the committee *before* this block was applied.
    pub committers_hash: Hash,
    pub proposer_address: Address,
    pub sortition_seed: Hash,
}

/// `last_certificate` is the certificate that finalized the *previous*
/// block, carried forward so a receiver can verify this block chains onto
/// a legitimately committed predecessor. `None` only for the block at
/// height 1, which has no predecessor certificate to carry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub tx_ids: Vec<TxId>,
    pub last_certificate: Option<Certificate>,
}

impl Block {
    pub fn tx_ids_hash(tx_ids: &[TxId]) -> Result<Hash, TypesError> {
        Ok(zarb_crypto::hash(&to_canonical_bytes(tx_ids)?))
    }

    pub fn hash(&self) -> Result<Hash, TypesError> {
        Ok(zarb_crypto::hash(&to_canonical_bytes(&self.header)?))
    }

    /// Hash of `last_certificate`, or the zero hash if this is the first
    /// block and there is no predecessor certificate.
    pub fn last_certificate_hash(&self) -> Result<Hash, TypesError> {
        match &self.last_certificate {
            Some(cert) => cert.hash(),
            None => Ok(Hash::zero()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_ids_hash_is_order_sensitive() {
        let a = Hash::zero();
        let b = zarb_crypto::hash(b"tx-b");
        let forward = Block::tx_ids_hash(&[a, b]).unwrap();
        let backward = Block::tx_ids_hash(&[b, a]).unwrap();
        assert_ne!(forward, backward);
    }
}
