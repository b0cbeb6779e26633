//! Genesis bootstrap: seeds a fresh store from a `Genesis` document and
//! builds the initial committee and `LastInfo`, grounded on
//! `original_source/genesis/genesis.go`'s `Accounts()`/`Validators()`
//! conversion into live account/validator records.

use zarb_crypto::{Address, VrfKeypair};
use zarb_store::StoreWriter;
use zarb_types::{Account, Committee, Genesis, LastInfo, Validator};

use crate::error::StateError;

/// Applies `genesis` to an empty `store`: one `Account` per genesis
/// account at its starting balance, one `Validator` per genesis validator
/// at its starting stake, and the initial committee drawn from every
/// genesis validator in declaration order.
///
/// A genesis validator carries only a BLS public key (§6); this core also
/// needs a VRF public key per validator for sortition (§4.2), which the
/// genesis file format does not carry. Non-BLS VRF keys are generated
/// fresh here and are not verifiable against any genesis-declared secret —
/// a real deployment supplies VRF keys through an out-of-band channel
/// (the consensus layer's collaborator surface, §1); this stand-in only
/// keeps the bootstrap path exercisable in tests.
pub async fn bootstrap<W: StoreWriter>(
    store: &W,
    genesis: &Genesis,
    committee_size: u32,
) -> Result<(Committee, LastInfo), StateError> {
    for (number, genesis_account) in genesis.accounts.iter().enumerate() {
        let _ = number;
        let account = Account::with_balance(genesis_account.address, genesis_account.balance);
        store.update_account(account).await?;
    }

    let mut members = Vec::with_capacity(genesis.validators.len());
    for (number, genesis_validator) in genesis.validators.iter().enumerate() {
        let vrf_public_key = VrfKeypair::generate(&mut rand::rngs::OsRng).public();
        let mut validator = Validator::new(number as u32, genesis_validator.public_key, vrf_public_key, 0);
        validator.stake = genesis_validator.stake;
        debug_assert_eq!(validator.address, genesis_validator.address);
        store.update_validator(validator.clone()).await?;
        members.push(validator);
    }

    let committee = Committee::new(members, committee_size);
    let genesis_time = genesis.genesis_time.timestamp() as u64;
    let last_info = LastInfo::genesis(genesis_time);

    Ok((committee, last_info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use zarb_crypto::SecretKey;
    use zarb_store::{MemoryStore, StoreReader};
    use zarb_types::{GenesisAccount, GenesisValidator};

    fn sample_genesis() -> Genesis {
        let pk = SecretKey::generate(&mut OsRng).public_key();
        Genesis {
            chain_name: "test".to_string(),
            genesis_time: "2020-01-01T00:00:00Z".parse().unwrap(),
            accounts: vec![GenesisAccount {
                address: Address::new([7u8; 20]),
                balance: 1000,
            }],
            validators: vec![GenesisValidator {
                address: Address::from_public_key(&pk),
                stake: 100,
                public_key: pk,
            }],
        }
    }

    #[tokio::test]
    async fn bootstrap_seeds_accounts_validators_and_committee() {
        let store = MemoryStore::new();
        let genesis = sample_genesis();
        let (committee, last_info) = bootstrap(&store, &genesis, 21).await.unwrap();

        assert_eq!(committee.members.len(), 1);
        assert_eq!(committee.total_stake(), 100);
        assert_eq!(last_info.last_height, 0);
        assert!(last_info.last_certificate.is_none());

        let acc = store.account(&Address::new([7u8; 20])).await.unwrap().unwrap();
        assert_eq!(acc.balance, 1000);
    }
}
