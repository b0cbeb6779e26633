use serde::{Deserialize, Serialize};
use zarb_crypto::Address;

/// A ledger account. `balance` is signed so intermediate executor math can
/// be checked before it is committed, but no valid post-state ever leaves
/// it negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub balance: i64,
    pub sequence: u32,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Account {
            address,
            balance: 0,
            sequence: 0,
        }
    }

    pub fn with_balance(address: Address, balance: i64) -> Self {
        Account {
            address,
            balance,
            sequence: 0,
        }
    }
}
