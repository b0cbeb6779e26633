//! BLS12-381 key pairs, signatures and signature aggregation.
//!
//! Public keys live in G1 (48-byte compressed), signatures and the hashed
//! message live in G2 (96-byte compressed) — the "minimal pubkey size"
//! convention. Aggregation sums G2 points; verification of an aggregate
//! checks a single pairing equation against the sum of signer public keys,
//! so it is commutative in the signer order but not tolerant to any signer
//! having signed a different message.

use blstrs::{Bls12, G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Scalar};
use ff::Field;
use group::{Curve, Group};
use pairing::{MillerLoopResult, MultiMillerLoop};
use rand_core::{CryptoRng, RngCore};
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::convert::TryInto;

use crate::error::CryptoError;

const DST: &[u8] = b"ZARB-BLS-SIG-BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

pub const SECRET_KEY_SIZE: usize = 32;
pub const PUBLIC_KEY_SIZE: usize = 48;
pub const SIGNATURE_SIZE: usize = 96;

#[derive(Clone)]
pub struct SecretKey(Scalar);

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub(crate) G1Affine);

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub(crate) G2Affine);

impl SecretKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        SecretKey(Scalar::random(rng))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey((G1Projective::generator() * self.0).to_affine())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        let h = hash_to_g2(message);
        Signature((h * self.0).to_affine())
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE] {
        self.0.to_bytes_be()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SECRET_KEY_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidSecretKey)?;
        let scalar = Scalar::from_bytes_be(&arr);
        if bool::from(scalar.is_some()) {
            Ok(SecretKey(scalar.unwrap()))
        } else {
            Err(CryptoError::InvalidSecretKey)
        }
    }
}

impl PublicKey {
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_compressed()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; PUBLIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        let point = G1Affine::from_compressed(&arr);
        if bool::from(point.is_some()) {
            Ok(PublicKey(point.unwrap()))
        } else {
            Err(CryptoError::InvalidPublicKey)
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.0.to_compressed()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        let point = G2Affine::from_compressed(&arr);
        if bool::from(point.is_some()) {
            Ok(Signature(point.unwrap()))
        } else {
            Err(CryptoError::InvalidSignature)
        }
    }

    pub fn verify(&self, public_key: &PublicKey, message: &[u8]) -> Result<(), CryptoError> {
        verify_aggregate(std::slice::from_ref(public_key), message, self)
    }
}

/// Sum of signatures over a common message. Order-independent: the
/// resulting point does not depend on the order signatures were combined.
pub fn aggregate(signatures: &[Signature]) -> Result<Signature, CryptoError> {
    if signatures.is_empty() {
        return Err(CryptoError::EmptyAggregate);
    }
    let sum = signatures
        .iter()
        .fold(G2Projective::identity(), |acc, sig| acc + G2Projective::from(sig.0));
    Ok(Signature(sum.to_affine()))
}

/// Verifies an aggregate signature against the set of signer public keys
/// and the single message they all signed, via one pairing check:
/// `e(sum(pk_i), H(m)) == e(G1::generator(), aggregate_signature)`.
pub fn verify_aggregate(
    public_keys: &[PublicKey],
    message: &[u8],
    signature: &Signature,
) -> Result<(), CryptoError> {
    if public_keys.is_empty() {
        return Err(CryptoError::EmptyAggregate);
    }
    let agg_pk = public_keys
        .iter()
        .fold(G1Projective::identity(), |acc, pk| acc + G1Projective::from(pk.0))
        .to_affine();
    let h_m = hash_to_g2(message).to_affine();
    let neg_g1 = -G1Affine::generator();

    let result = Bls12::multi_miller_loop(&[
        (&agg_pk, &G2Prepared::from(h_m)),
        (&neg_g1, &G2Prepared::from(signature.0)),
    ])
    .final_exponentiation();

    if bool::from(result.is_identity()) {
        Ok(())
    } else {
        Err(CryptoError::AggregateVerificationFailed)
    }
}

fn hash_to_g2(message: &[u8]) -> G2Projective {
    G2Projective::hash_to_curve(message, DST, &[])
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(SerdeError::custom)?;
        PublicKey::from_bytes(&bytes).map_err(SerdeError::custom)
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(SerdeError::custom)?;
        Signature::from_bytes(&bytes).map_err(SerdeError::custom)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> (SecretKey, PublicKey) {
        let sk = SecretKey::generate(&mut OsRng);
        let pk = sk.public_key();
        (sk, pk)
    }

    #[test]
    fn sign_and_verify_single() {
        let (sk, pk) = keypair();
        let sig = sk.sign(b"block-hash");
        assert!(sig.verify(&pk, b"block-hash").is_ok());
        assert!(sig.verify(&pk, b"different").is_err());
    }

    #[test]
    fn aggregate_is_order_independent() {
        let (sk1, pk1) = keypair();
        let (sk2, pk2) = keypair();
        let (sk3, pk3) = keypair();
        let msg = b"commit-sign-bytes";

        let s1 = sk1.sign(msg);
        let s2 = sk2.sign(msg);
        let s3 = sk3.sign(msg);

        let agg_forward = aggregate(&[s1, s2, s3]).unwrap();
        let agg_reverse = aggregate(&[s3, s2, s1]).unwrap();
        assert_eq!(agg_forward.to_bytes(), agg_reverse.to_bytes());

        assert!(verify_aggregate(&[pk1, pk2, pk3], msg, &agg_forward).is_ok());
    }

    #[test]
    fn aggregate_rejects_wrong_message_signer() {
        let (sk1, pk1) = keypair();
        let (sk2, pk2) = keypair();
        let msg = b"commit-sign-bytes";

        let s1 = sk1.sign(msg);
        let s2 = sk2.sign(b"a-different-message");

        let agg = aggregate(&[s1, s2]).unwrap();
        assert!(verify_aggregate(&[pk1, pk2], msg, &agg).is_err());
    }

    #[test]
    fn aggregate_rejects_missing_signer() {
        let (sk1, pk1) = keypair();
        let (sk2, _pk2) = keypair();
        let msg = b"commit-sign-bytes";

        let s1 = sk1.sign(msg);
        let agg = aggregate(&[s1]).unwrap();

        // Verifying against a key that never signed must fail.
        assert!(verify_aggregate(&[pk1], msg, &agg).is_ok());
        let (_, pk_extra) = keypair();
        assert!(verify_aggregate(&[pk1, pk_extra], msg, &agg).is_err());
        let _ = sk2;
    }

    #[test]
    fn aggregate_rejects_extra_signer() {
        let (sk1, pk1) = keypair();
        let (sk2, pk2) = keypair();
        let msg = b"commit-sign-bytes";

        let s1 = sk1.sign(msg);
        let s2 = sk2.sign(msg);
        let agg = aggregate(&[s1, s2]).unwrap();

        // Verifying the two-signer aggregate against only one key must fail.
        assert!(verify_aggregate(&[pk1], msg, &agg).is_err());
        let _ = pk2;
    }
}
