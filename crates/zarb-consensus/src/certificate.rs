//! Certificate verification (§4.4): checks that a quorum certificate
//! carries an aggregated BLS signature from a ⅔+ supermajority of the
//! committee that was active when the certified block was produced.

use zarb_crypto::{Hash, PublicKey};
use zarb_types::{commit_sign_bytes, Certificate, Committee};

use crate::error::CertificateError;

/// `committers ∪ absentees == committee`, `committers ∩ absentees == ∅`,
/// the signer set's stake clears the supermajority threshold, and the
/// aggregate signature verifies against the signers' public keys over
/// `commit_sign_bytes(block_hash, round)`.
pub fn verify_certificate(
    committee: &Committee,
    block_hash: Hash,
    cert: &Certificate,
) -> Result<(), CertificateError> {
    if cert.committers != committee.validator_numbers() {
        return Err(CertificateError::CommittersMismatch);
    }

    let mut previous: Option<u32> = None;
    for &absentee in &cert.absentees {
        if let Some(prev) = previous {
            if absentee == prev {
                return Err(CertificateError::DuplicateAbsentee(absentee));
            }
            if absentee < prev {
                return Err(CertificateError::AbsenteesNotSorted);
            }
        }
        if !cert.committers.contains(&absentee) {
            return Err(CertificateError::AbsenteeNotInCommitters(absentee));
        }
        previous = Some(absentee);
    }

    let signers = cert.signers();
    let total_stake = committee.total_stake();
    let required = required_supermajority_stake(total_stake);

    let mut signer_stake = 0i64;
    let mut signer_keys: Vec<PublicKey> = Vec::with_capacity(signers.len());
    for number in &signers {
        let validator = committee
            .members
            .iter()
            .find(|v| v.number == *number)
            .ok_or(CertificateError::UnknownValidatorNumber(*number))?;
        signer_stake += validator.stake;
        signer_keys.push(validator.public_key);
    }

    if signer_stake < required {
        return Err(CertificateError::BelowSupermajority {
            signer_stake,
            required,
        });
    }

    let sign_bytes = commit_sign_bytes(block_hash, cert.round)?;
    zarb_crypto::bls::verify_aggregate(&signer_keys, &sign_bytes, &cert.aggregated_signature)
        .map_err(|_| CertificateError::InvalidAggregateSignature)
}

/// `⌈2·total_stake/3⌉ + 1` — a strict supermajority, one stake-unit more
/// than exactly two-thirds.
fn required_supermajority_stake(total_stake: i64) -> i64 {
    let two_thirds_ceil = (2 * total_stake + 2) / 3;
    two_thirds_ceil + 1
}

/// Accepts a stronger certificate for the already-committed last block:
/// any certificate that verifies against `committee` for `block_hash` and
/// whose signer set is a strict superset of the currently stored one's.
/// Never accepts a certificate for a different block hash.
pub fn update_last_commit(
    committee: &Committee,
    block_hash: Hash,
    current: &Certificate,
    candidate: &Certificate,
) -> Result<bool, CertificateError> {
    if candidate.block_hash != block_hash || current.block_hash != block_hash {
        return Err(CertificateError::WrongBlockHash {
            expected: block_hash.to_hex(),
            got: candidate.block_hash.to_hex(),
        });
    }

    verify_certificate(committee, block_hash, candidate)?;

    let current_signers: std::collections::HashSet<u32> = current.signers().into_iter().collect();
    let candidate_signers: std::collections::HashSet<u32> =
        candidate.signers().into_iter().collect();

    let is_strict_superset = candidate_signers.is_superset(&current_signers)
        && candidate_signers.len() > current_signers.len();

    Ok(is_strict_superset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use zarb_crypto::{Address, SecretKey, VrfKeypair};
    use zarb_types::Validator;

    fn committee_of_four_equal_stake() -> (Committee, Vec<SecretKey>) {
        let mut members = Vec::new();
        let mut secrets = Vec::new();
        for i in 0..4u32 {
            let sk = SecretKey::generate(&mut OsRng);
            let vrf_pk = VrfKeypair::generate(&mut OsRng).public();
            let mut v = Validator::new(i, sk.public_key(), vrf_pk, 0);
            v.stake = 100;
            members.push(v);
            secrets.push(sk);
        }
        (Committee::new(members, 21), secrets)
    }

    fn sign_commit(secrets: &[SecretKey], signers: &[u32], block_hash: Hash, round: u16) -> Certificate {
        let sign_bytes = commit_sign_bytes(block_hash, round).unwrap();
        let sigs: Vec<_> = signers
            .iter()
            .map(|&n| secrets[n as usize].sign(&sign_bytes))
            .collect();
        Certificate {
            block_hash,
            round,
            committers: vec![0, 1, 2, 3],
            absentees: (0..4u32).filter(|n| !signers.contains(n)).collect(),
            aggregated_signature: zarb_crypto::bls::aggregate(&sigs).unwrap(),
        }
    }

    #[test]
    fn three_of_four_signers_clears_supermajority() {
        let (committee, secrets) = committee_of_four_equal_stake();
        let block_hash = zarb_crypto::hash(b"block-h");
        let cert = sign_commit(&secrets, &[0, 1, 2], block_hash, 0);
        assert!(verify_certificate(&committee, block_hash, &cert).is_ok());
    }

    #[test]
    fn half_signers_is_below_supermajority() {
        let (committee, secrets) = committee_of_four_equal_stake();
        let block_hash = zarb_crypto::hash(b"block-h");
        let cert = sign_commit(&secrets, &[0, 1], block_hash, 0);
        assert!(matches!(
            verify_certificate(&committee, block_hash, &cert),
            Err(CertificateError::BelowSupermajority { .. })
        ));
    }

    #[test]
    fn foreign_signer_is_rejected() {
        let (committee, secrets) = committee_of_four_equal_stake();
        let block_hash = zarb_crypto::hash(b"block-h");
        let mut cert = sign_commit(&secrets, &[0, 1, 2], block_hash, 0);

        let foreign = SecretKey::generate(&mut OsRng);
        let sign_bytes = commit_sign_bytes(block_hash, 0).unwrap();
        let sigs = vec![
            secrets[0].sign(&sign_bytes),
            secrets[1].sign(&sign_bytes),
            foreign.sign(&sign_bytes),
        ];
        cert.aggregated_signature = zarb_crypto::bls::aggregate(&sigs).unwrap();
        cert.absentees = vec![2];

        // Stake still clears supermajority (3/4 members counted as signers)
        // but the aggregate includes a foreign signature, so it must fail.
        assert!(matches!(
            verify_certificate(&committee, block_hash, &cert),
            Err(CertificateError::InvalidAggregateSignature)
        ));
        let _ = Address::treasury();
    }

    #[test]
    fn update_last_commit_accepts_strict_superset_only() {
        let (committee, secrets) = committee_of_four_equal_stake();
        let block_hash = zarb_crypto::hash(b"block-h");
        let weaker = sign_commit(&secrets, &[0, 1, 2], block_hash, 0);
        let stronger = sign_commit(&secrets, &[0, 1, 2, 3], block_hash, 0);

        let updated = update_last_commit(&committee, block_hash, &weaker, &stronger).unwrap();
        assert!(updated);

        let not_updated = update_last_commit(&committee, block_hash, &stronger, &weaker).unwrap();
        assert!(!not_updated);
    }

    #[test]
    fn update_last_commit_rejects_different_block() {
        let (committee, secrets) = committee_of_four_equal_stake();
        let block_hash = zarb_crypto::hash(b"block-h");
        let other_hash = zarb_crypto::hash(b"other-block");
        let current = sign_commit(&secrets, &[0, 1, 2], block_hash, 0);
        let candidate = sign_commit(&secrets, &[0, 1, 2, 3], other_hash, 0);

        assert!(update_last_commit(&committee, block_hash, &current, &candidate).is_err());
    }
}
