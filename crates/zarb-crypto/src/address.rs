use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryInto,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::bls::PublicKey;
use crate::error::CryptoError;
use crate::hash::hash;

pub const ADDRESS_SIZE: usize = 20;

/// 20-byte validator/account identifier. Every non-treasury address is the
/// leading 20 bytes of `hash(public_key)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Address(bytes)
    }

    /// The distinguished all-zero treasury address that funds subsidies.
    pub const fn treasury() -> Self {
        Address([0u8; ADDRESS_SIZE])
    }

    pub fn is_treasury(&self) -> bool {
        self.0 == [0u8; ADDRESS_SIZE]
    }

    pub fn from_public_key(pk: &PublicKey) -> Self {
        let digest = hash(&pk.to_bytes());
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_SIZE]);
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;
        let bytes: [u8; ADDRESS_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidAddress("wrong byte length".into()))?;
        Ok(Address(bytes))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(SerdeError::custom)
    }
}
