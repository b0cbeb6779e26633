use serde::{Deserialize, Serialize};
use zarb_crypto::{Address, PublicKey, VrfPublicKey};

/// A bonded validator. `number` is its stable index within the validator
/// set — certificates reference validators by this number, not by address,
/// so committer/absentee lists stay compact.
///
/// Carries two distinct keys: `public_key` (BLS, used for committee commit
/// signatures) and `vrf_public_key` (schnorrkel, used for sortition
/// proofs) — the curves are unrelated, so one key cannot stand in for both.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Validator {
    pub number: u32,
    pub public_key: PublicKey,
    pub vrf_public_key: VrfPublicKey,
    pub address: Address,
    pub stake: i64,
    pub bonding_height: u32,
    pub unbonding_height: Option<u32>,
    pub last_joined_height: u32,
}

impl Validator {
    pub fn new(
        number: u32,
        public_key: PublicKey,
        vrf_public_key: VrfPublicKey,
        bonding_height: u32,
    ) -> Self {
        let address = Address::from_public_key(&public_key);
        Validator {
            number,
            public_key,
            vrf_public_key,
            address,
            stake: 0,
            bonding_height,
            unbonding_height: None,
            last_joined_height: bonding_height,
        }
    }

    pub fn is_unbonded(&self) -> bool {
        self.unbonding_height.is_some()
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.address == other.address
    }
}
impl Eq for Validator {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use zarb_crypto::{SecretKey, VrfKeypair};

    #[test]
    fn address_is_derived_from_public_key() {
        let sk = SecretKey::generate(&mut OsRng);
        let pk = sk.public_key();
        let vrf_pk = VrfKeypair::generate(&mut OsRng).public();
        let v = Validator::new(0, pk, vrf_pk, 1);
        assert_eq!(v.address, Address::from_public_key(&v.public_key));
    }
}
