//! Canonical CBOR encoding helpers shared by every sign-bytes computation in
//! this crate. `ciborium` serializes struct fields in declaration order and
//! produces the same bytes for the same value, which is all the determinism
//! the signature scheme needs — there is no map-key sorting requirement
//! because every signed value here is a struct, never an open map.

use serde::Serialize;

use crate::error::TypesError;

pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, TypesError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| TypesError::Encode(e.to_string()))?;
    Ok(buf)
}

pub fn from_canonical_bytes<T: for<'de> serde::Deserialize<'de>>(
    bytes: &[u8],
) -> Result<T, TypesError> {
    ciborium::from_reader(bytes).map_err(|e| TypesError::Decode(e.to_string()))
}
