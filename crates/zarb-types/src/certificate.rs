use serde::{Deserialize, Serialize};
use zarb_crypto::{Hash, Signature};

use crate::cbor::to_canonical_bytes;
use crate::error::TypesError;

/// A quorum certificate: proof that a supermajority of the committee active
/// at the time signed the block. `committers`/`absentees` reference
/// validators by their stable `number`, not by address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Certificate {
    pub block_hash: Hash,
    pub round: u16,
    pub committers: Vec<u32>,
    pub absentees: Vec<u32>,
    pub aggregated_signature: Signature,
}

#[derive(Serialize)]
struct CommitSignView {
    block_hash: Hash,
    round: u16,
}

/// `commit_sign_bytes(bh, round) = canonical_encoding(bh ‖ round)`.
pub fn commit_sign_bytes(block_hash: Hash, round: u16) -> Result<Vec<u8>, TypesError> {
    to_canonical_bytes(&CommitSignView { block_hash, round })
}

impl Certificate {
    /// Validator numbers that actually signed: `committers \ absentees`.
    pub fn signers(&self) -> Vec<u32> {
        self.committers
            .iter()
            .copied()
            .filter(|c| !self.absentees.contains(c))
            .collect()
    }

    pub fn hash(&self) -> Result<Hash, TypesError> {
        Ok(zarb_crypto::hash(&to_canonical_bytes(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signers_excludes_absentees() {
        let cert = Certificate {
            block_hash: Hash::zero(),
            round: 0,
            committers: vec![0, 1, 2, 3],
            absentees: vec![3],
            aggregated_signature: dummy_signature(),
        };
        assert_eq!(cert.signers(), vec![0, 1, 2]);
    }

    fn dummy_signature() -> Signature {
        let sk = zarb_crypto::SecretKey::generate(&mut rand::rngs::OsRng);
        sk.sign(b"test")
    }
}
