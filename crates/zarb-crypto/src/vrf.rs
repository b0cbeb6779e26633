//! VRF-based sortition proofs, used by validators to self-elect into the
//! rotating committee without coordination. A proof is verifiable against
//! the validator's public key and the sortition seed it was computed over;
//! verification yields a pseudorandom output the caller compares against a
//! stake-weighted threshold.

use rand_core::{CryptoRng, RngCore};
use schnorrkel::context::signing_context;
use schnorrkel::vrf::{VRFOutput, VRFProof as SchnorrkelVrfProof};
use schnorrkel::Keypair;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::convert::TryInto;
use std::str::FromStr;

use crate::error::CryptoError;

const VRF_CONTEXT: &[u8] = b"ZarbSortitionVRF";

pub const VRF_PUBLIC_KEY_SIZE: usize = 32;
pub const VRF_OUTPUT_SIZE: usize = 32;
pub const VRF_PROOF_SIZE: usize = 64;

pub struct VrfKeypair(Keypair);

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VrfPublicKey(schnorrkel::PublicKey);

/// A validator's private sortition key. `Debug` is redacted so it never
/// leaks into logs.
pub struct WrappedVrfSecret(schnorrkel::SecretKey);

#[derive(Clone)]
pub struct VrfProof {
    output: VRFOutput,
    proof: SchnorrkelVrfProof,
}

impl VrfKeypair {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        VrfKeypair(Keypair::generate_with(rng))
    }

    pub fn public(&self) -> VrfPublicKey {
        VrfPublicKey(self.0.public)
    }

    pub fn secret(&self) -> WrappedVrfSecret {
        WrappedVrfSecret(self.0.secret.clone())
    }

    /// Produce a sortition proof over `seed` (the previous block's
    /// sortition seed concatenated with the validator address).
    pub fn prove(&self, seed: &[u8]) -> VrfProof {
        let transcript = signing_context(VRF_CONTEXT).bytes(seed);
        let (in_out, proof, _) = self.0.vrf_sign(transcript);
        VrfProof {
            output: in_out.to_output(),
            proof,
        }
    }
}

impl VrfPublicKey {
    pub fn to_bytes(&self) -> [u8; VRF_PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        schnorrkel::PublicKey::from_bytes(bytes)
            .map(VrfPublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Verify `proof` was computed over `seed` by the holder of this key,
    /// returning the 32-byte pseudorandom output on success.
    pub fn verify(&self, seed: &[u8], proof: &VrfProof) -> Result<[u8; VRF_OUTPUT_SIZE], CryptoError> {
        let transcript = signing_context(VRF_CONTEXT).bytes(seed);
        let (in_out, _) = self
            .0
            .vrf_verify(transcript, &proof.output, &proof.proof)
            .map_err(|_| CryptoError::InvalidVrfProof)?;
        let bytes = in_out.to_output().to_bytes();
        bytes.try_into().map_err(|_| CryptoError::InvalidVrfProof)
    }
}

impl VrfProof {
    pub fn to_bytes(&self) -> [u8; VRF_OUTPUT_SIZE + VRF_PROOF_SIZE] {
        let mut out = [0u8; VRF_OUTPUT_SIZE + VRF_PROOF_SIZE];
        out[..VRF_OUTPUT_SIZE].copy_from_slice(&self.output.to_bytes());
        out[VRF_OUTPUT_SIZE..].copy_from_slice(&self.proof.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != VRF_OUTPUT_SIZE + VRF_PROOF_SIZE {
            return Err(CryptoError::InvalidVrfProof);
        }
        let output = VRFOutput::from_bytes(&bytes[..VRF_OUTPUT_SIZE])
            .map_err(|_| CryptoError::InvalidVrfProof)?;
        let proof = SchnorrkelVrfProof::from_bytes(&bytes[VRF_OUTPUT_SIZE..])
            .map_err(|_| CryptoError::InvalidVrfProof)?;
        Ok(VrfProof { output, proof })
    }
}

impl WrappedVrfSecret {
    /// Raw 64-byte schnorrkel secret key, the counterpart to `FromStr`'s
    /// hex decode — used when a secret needs to be handed to a keyfile
    /// for encryption rather than parsed back from one.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

impl std::fmt::Debug for WrappedVrfSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WrappedVrfSecret([REDACTED])")
    }
}

impl FromStr for WrappedVrfSecret {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSecretKey)?;
        if bytes.len() != 64 {
            return Err(CryptoError::InvalidSecretKey);
        }
        schnorrkel::SecretKey::from_bytes(&bytes)
            .map(WrappedVrfSecret)
            .map_err(|_| CryptoError::InvalidSecretKey)
    }
}

impl Serialize for VrfPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for VrfPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(SerdeError::custom)?;
        VrfPublicKey::from_bytes(&bytes).map_err(SerdeError::custom)
    }
}

impl Serialize for VrfProof {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for VrfProof {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(SerdeError::custom)?;
        VrfProof::from_bytes(&bytes).map_err(SerdeError::custom)
    }
}
