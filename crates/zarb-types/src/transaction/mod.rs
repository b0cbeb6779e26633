mod payload;

pub use payload::{BondPayload, Payload, SendPayload, SortitionPayload, SubsidyPayload};

use serde::{Deserialize, Serialize};
use zarb_crypto::{Hash, Signature};

use crate::cbor::to_canonical_bytes;
use crate::error::TypesError;

pub type TxId = Hash;

/// A single state mutation: sequence + fee + a tagged payload variant, plus
/// an optional signature and free-form memo. `Subsidy` transactions carry no
/// signature — they are constructed by the proposer, not broadcast by a
/// signer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub sequence: u32,
    pub fee: i64,
    pub payload: Payload,
    pub memo: Option<String>,
    pub signature: Option<Signature>,
}

/// The subset of `Transaction` fields covered by the signature, used both
/// to compute `id()` and to compute `sign_bytes()` — the original
/// transaction minus its own signature field.
#[derive(Serialize)]
struct UnsignedView<'a> {
    sequence: u32,
    fee: i64,
    payload: &'a Payload,
    memo: &'a Option<String>,
}

impl Transaction {
    pub fn new(sequence: u32, fee: i64, payload: Payload, memo: Option<String>) -> Self {
        Transaction {
            sequence,
            fee,
            payload,
            memo,
            signature: None,
        }
    }

    fn unsigned_view(&self) -> UnsignedView<'_> {
        UnsignedView {
            sequence: self.sequence,
            fee: self.fee,
            payload: &self.payload,
            memo: &self.memo,
        }
    }

    /// Canonical bytes the signature is computed over: the CBOR encoding of
    /// the transaction with the signature field omitted.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, TypesError> {
        to_canonical_bytes(&self.unsigned_view())
    }

    /// `ID = hash(canonical_encoding(tx_without_signature_field))`.
    pub fn id(&self) -> Result<TxId, TypesError> {
        Ok(zarb_crypto::hash(&self.sign_bytes()?))
    }

    pub fn verify_signature(&self, public_key: &zarb_crypto::PublicKey) -> Result<bool, TypesError> {
        let Some(sig) = &self.signature else {
            return Ok(false);
        };
        let bytes = self.sign_bytes()?;
        Ok(sig.verify(public_key, &bytes).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use zarb_crypto::{Address, SecretKey};

    fn sample_send_payload() -> Payload {
        let pk = SecretKey::generate(&mut OsRng).public_key();
        Payload::Send(SendPayload {
            sender: Address::treasury(),
            sender_public_key: pk,
            receiver: Address::treasury(),
            amount: 10,
        })
    }

    #[test]
    fn id_changes_with_sequence() {
        let payload = sample_send_payload();
        let tx1 = Transaction::new(1, 1, payload.clone(), None);
        let tx2 = Transaction::new(2, 1, payload, None);
        assert_ne!(tx1.id().unwrap(), tx2.id().unwrap());
    }

    #[test]
    fn id_is_independent_of_signature() {
        let payload = sample_send_payload();
        let mut tx = Transaction::new(1, 1, payload, None);
        let id_before = tx.id().unwrap();
        // Signature field is excluded from the sign-bytes by construction;
        // forging one in by hand must not move the id.
        let sk = zarb_crypto::SecretKey::generate(&mut rand::rngs::OsRng);
        tx.signature = Some(sk.sign(&tx.sign_bytes().unwrap()));
        assert_eq!(id_before, tx.id().unwrap());
    }
}
