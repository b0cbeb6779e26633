//! BLS12-381 key pairs and aggregate signatures, VRF sortition proofs,
//! addresses, hashing and the passphrase-protected keyfile codec underlying
//! the zarb state core.

pub mod address;
pub mod bls;
pub mod error;
pub mod hash;
pub mod keyfile;
pub mod vrf;

pub use address::Address;
pub use bls::{PublicKey, SecretKey, Signature};
pub use error::CryptoError;
pub use hash::{hash, Hash, Hashable};
pub use keyfile::Keyfile;
pub use vrf::{VrfKeypair, VrfProof, VrfPublicKey};
