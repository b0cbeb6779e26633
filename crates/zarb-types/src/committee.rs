use serde::{Deserialize, Serialize};
use zarb_crypto::Hash;

use crate::cbor::to_canonical_bytes;
use crate::error::TypesError;
use crate::validator::Validator;

/// The currently active rotating signing set. `members` is ordered by
/// validator number; `proposer_position` is an index into it, not a
/// validator number, so it stays valid across evictions that shift numbers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Committee {
    pub members: Vec<Validator>,
    pub size: u32,
    pub proposer_position: u32,
}

impl Committee {
    pub fn new(members: Vec<Validator>, size: u32) -> Self {
        Committee {
            members,
            size,
            proposer_position: 0,
        }
    }

    pub fn total_stake(&self) -> i64 {
        self.members.iter().map(|v| v.stake).sum()
    }

    pub fn proposer(&self) -> Option<&Validator> {
        self.members.get(self.proposer_position as usize % self.members.len().max(1))
    }

    pub fn validator_numbers(&self) -> Vec<u32> {
        self.members.iter().map(|v| v.number).collect()
    }

    pub fn contains_address(&self, address: &zarb_crypto::Address) -> bool {
        self.members.iter().any(|v| &v.address == address)
    }

    /// Hash of the concatenated canonical encoding of members, in order.
    pub fn committers_hash(&self) -> Result<Hash, TypesError> {
        Ok(zarb_crypto::hash(&to_canonical_bytes(&self.members)?))
    }
}
