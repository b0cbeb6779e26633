//! Domain entities for the zarb state core: accounts, validators,
//! transactions, blocks, certificates, committees, genesis and last-info
//! snapshots, plus the canonical CBOR sign-bytes encoding they share.

pub mod account;
pub mod block;
pub mod cbor;
pub mod certificate;
pub mod committee;
pub mod error;
pub mod genesis;
pub mod last_info;
pub mod transaction;
pub mod validator;

pub use account::Account;
pub use block::{Block, Header, BLOCK_VERSION};
pub use certificate::{commit_sign_bytes, Certificate};
pub use committee::Committee;
pub use error::TypesError;
pub use genesis::Genesis;
pub use last_info::{advance_state_hash, LastInfo, PersistedLastInfo};
pub use transaction::{BondPayload, Payload, SendPayload, SortitionPayload, SubsidyPayload, Transaction, TxId};
pub use validator::Validator;
