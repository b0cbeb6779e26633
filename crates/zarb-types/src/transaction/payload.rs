use serde::{Deserialize, Serialize};
use zarb_crypto::{Address, PublicKey, VrfProof, VrfPublicKey};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendPayload {
    pub sender: Address,
    /// Carried so the signature can be checked before an address has ever
    /// been seen in an Account record (accounts store no key material).
    pub sender_public_key: PublicKey,
    pub receiver: Address,
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BondPayload {
    pub bonder: Address,
    pub bonder_public_key: PublicKey,
    pub validator_public_key: PublicKey,
    pub validator_vrf_public_key: VrfPublicKey,
    pub stake: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SortitionPayload {
    pub address: Address,
    pub proof: VrfProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubsidyPayload {
    pub receiver: Address,
    pub amount: i64,
}

/// The closed set of transaction kinds this core understands. Adding a kind
/// means adding a variant here and an executor for it — no open dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Send(SendPayload),
    Bond(BondPayload),
    Sortition(SortitionPayload),
    Subsidy(SubsidyPayload),
}

impl Payload {
    pub fn is_subsidy(&self) -> bool {
        matches!(self, Payload::Subsidy(_))
    }

    pub fn primary_signer(&self) -> Option<Address> {
        match self {
            Payload::Send(p) => Some(p.sender),
            Payload::Bond(p) => Some(p.bonder),
            Payload::Sortition(p) => Some(p.address),
            Payload::Subsidy(_) => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::Send(_) => "send",
            Payload::Bond(_) => "bond",
            Payload::Sortition(_) => "sortition",
            Payload::Subsidy(_) => "subsidy",
        }
    }
}
