//! Restores a `StateMachine` from `<datadir>/last_info.json` plus the
//! persisted store on node restart, grounded line-for-line on
//! `original_source/state/last_info/last_info.go`'s `RestoreLastInfo`: the
//! persisted file only carries `{last_height, last_certificate}`, so the
//! committee and sortition seed are re-derived by re-reading the last
//! committed block and re-scanning its transactions for Sortition joiners.

use std::path::Path;

use zarb_types::{advance_state_hash, Block, Committee, LastInfo, Payload, PersistedLastInfo, Validator};

use crate::error::StateError;
use crate::machine::StateMachine;

/// Reads `<datadir>/last_info.json`, loads the block it points at, and
/// rebuilds the committee that certified it (from that certificate's
/// committer numbers) plus the committee that results from applying that
/// block's own sortition joiners on top — the same two snapshots
/// `apply_block` keeps in memory during normal operation.
pub async fn restore<S: zarb_store::Store>(
    store: S,
    datadir: std::path::PathBuf,
    committee_size: u32,
    join_limit: usize,
    min_tenure_blocks: u32,
) -> Result<StateMachine<S>, StateError> {
    use zarb_store::StoreReader;

    let path = datadir.join("last_info.json");
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| StateError::LastInfoIo(format!("unable to read {}: {e}", path.display())))?;
    let persisted = PersistedLastInfo::from_cbor(&bytes)?;
    let height = persisted.last_height as u64;

    let block = store
        .block(height)
        .await?
        .ok_or_else(|| StateError::UnknownTransaction(format!("block at height {height} is missing from the store")))?;

    let mut joined_validators = Vec::new();
    for id in &block.tx_ids {
        let tx = store
            .transaction(id)
            .await?
            .ok_or_else(|| StateError::UnknownTransaction(format!("transaction {id} is missing from the store")))?;
        if let Payload::Sortition(payload) = &tx.payload {
            let validator = store
                .validator(&payload.address)
                .await?
                .ok_or_else(|| StateError::UnknownTransaction(format!("validator {} is missing from the store", payload.address)))?;
            joined_validators.push(validator);
        }
    }

    let mut members: Vec<Validator> = Vec::new();
    if let Some(cert) = &block.last_certificate {
        for &number in &cert.committers {
            let validator = store
                .validator_by_number(number)
                .await?
                .ok_or_else(|| StateError::UnknownTransaction(format!("committee member {number} is missing from the store")))?;
            members.push(validator);
        }
    }

    let mut committee_at_last_commit = Committee::new(members, committee_size);
    committee_at_last_commit.proposer_position = committee_at_last_commit
        .members
        .iter()
        .position(|v| v.address == block.header.proposer_address)
        .unwrap_or(0) as u32;

    let mut committee = committee_at_last_commit.clone();
    zarb_consensus::rotate(
        &mut committee,
        &joined_validators,
        join_limit,
        height as u32,
        persisted.last_certificate.round,
        min_tenure_blocks,
    );

    let tx_ids_hash = Block::tx_ids_hash(&block.tx_ids)?;
    let last_info = LastInfo {
        last_height: height,
        last_certificate: Some(persisted.last_certificate),
        last_block_hash: block.hash()?,
        last_block_time: block.header.time,
        last_sortition_seed: block.header.sortition_seed,
        state_hash: advance_state_hash(block.header.state_hash, block.hash()?, tx_ids_hash)?,
        last_receipts_hash: tx_ids_hash,
    };

    let next_validator_number = next_free_validator_number(&store).await?;

    Ok(StateMachine::assemble(
        store,
        datadir,
        committee,
        committee_at_last_commit,
        last_info,
        next_validator_number,
    ))
}

/// Validator numbers are assigned sequentially starting from zero by
/// `Bond` execution; the first unassigned number is the next one to hand
/// out. Only run once, at startup.
async fn next_free_validator_number<S: zarb_store::Store>(store: &S) -> Result<u32, StateError> {
    use zarb_store::StoreReader;

    let mut number = 0u32;
    while store.validator_by_number(number).await?.is_some() {
        number += 1;
    }
    Ok(number)
}

pub fn last_info_path(datadir: &Path) -> std::path::PathBuf {
    datadir.join("last_info.json")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use rand::rngs::OsRng;
    use zarb_crypto::SecretKey;
    use zarb_store::MemoryStore;
    use zarb_types::{commit_sign_bytes, Genesis, GenesisValidator, Header, SubsidyPayload, Transaction, BLOCK_VERSION};

    use super::*;
    use crate::genesis::bootstrap;

    fn temp_datadir(tag: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("zarb-state-restore-test-{}-{tag}-{n}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn restore_recovers_height_committee_and_last_info_after_restart() {
        let store = Arc::new(MemoryStore::new());
        let sk = SecretKey::generate(&mut OsRng);
        let genesis = Genesis {
            chain_name: "test".to_string(),
            genesis_time: "2020-01-01T00:00:00Z".parse().unwrap(),
            accounts: vec![],
            validators: vec![GenesisValidator {
                address: zarb_crypto::Address::from_public_key(&sk.public_key()),
                stake: 100,
                public_key: sk.public_key(),
            }],
        };
        let (committee, last_info) = bootstrap(&store, &genesis, 1).await.unwrap();
        let proposer = committee.members[0].clone();
        let datadir = temp_datadir("roundtrip");

        let machine = StateMachine::new(Arc::clone(&store), datadir.clone(), committee.clone(), last_info.clone(), 1);

        let subsidy_tx = Transaction::new(
            0,
            0,
            Payload::Subsidy(SubsidyPayload {
                receiver: proposer.address,
                amount: zarb_execution::config::BLOCK_REWARD,
            }),
            None,
        );
        let tx_ids = vec![subsidy_tx.id().unwrap()];
        let tx_ids_hash = Block::tx_ids_hash(&tx_ids).unwrap();
        let header = Header {
            version: BLOCK_VERSION,
            time: last_info.last_block_time + crate::config::BLOCK_PERIOD_SECS,
            last_block_hash: last_info.last_block_hash,
            state_hash: last_info.state_hash,
            tx_ids_hash,
            last_receipts_hash: last_info.last_receipts_hash,
            last_certificate_hash: zarb_crypto::Hash::zero(),
            committers_hash: committee.committers_hash().unwrap(),
            proposer_address: proposer.address,
            sortition_seed: zarb_crypto::hash(b"seed-restore"),
        };
        let block = Block {
            header,
            tx_ids,
            last_certificate: None,
        };
        let block_hash = block.hash().unwrap();
        let sign_bytes = commit_sign_bytes(block_hash, 0).unwrap();
        let certificate = zarb_types::Certificate {
            block_hash,
            round: 0,
            committers: vec![0],
            absentees: vec![],
            aggregated_signature: zarb_crypto::bls::aggregate(&[sk.sign(&sign_bytes)]).unwrap(),
        };

        machine
            .apply_block(1, block.clone(), certificate, &[subsidy_tx.clone()])
            .await
            .unwrap();
        // The real on-disk store persists a committed block's transactions
        // alongside it; `MemoryStore` needs this done explicitly so restore
        // can re-read the Sortition transactions of the block it recovers.
        store.seed_transactions(vec![subsidy_tx]).await.unwrap();

        let restored = restore(Arc::clone(&store), datadir, 1, 1, 1).await.unwrap();
        assert_eq!(restored.last_height().await, 1);
        assert_eq!(restored.next_validator_number().await, 1);

        let restored_last_info = restored.last_info().await;
        assert_eq!(restored_last_info.last_block_hash, block_hash);

        let restored_committee = restored.committee().await;
        assert_eq!(restored_committee.members.len(), 1);
        assert_eq!(restored_committee.members[0].address, proposer.address);
    }
}
