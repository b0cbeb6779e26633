use thiserror::Error;

/// The error taxonomy from spec §7, composed upward from each lower crate's
/// own enum via `#[from]`, the way `BlockchainError` composes
/// `GenesisError`/`StorageError` in the teacher.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("invalid proposer: expected {expected}, got {got}")]
    InvalidProposer { expected: String, got: String },

    #[error("height mismatch: expected {expected}, got {got}")]
    InvalidHeight { expected: u64, got: u64 },

    #[error("block is missing its mandatory first Subsidy transaction")]
    MissingSubsidy,

    #[error(transparent)]
    InvalidTx(#[from] zarb_execution::error::ExecutionError),

    #[error("unknown transaction {0}")]
    UnknownTransaction(String),

    #[error(transparent)]
    Certificate(#[from] zarb_consensus::error::CertificateError),

    #[error(transparent)]
    Types(#[from] zarb_types::TypesError),

    #[error(transparent)]
    Store(#[from] zarb_store::StoreError),

    #[error(transparent)]
    Crypto(#[from] zarb_crypto::CryptoError),

    #[error("last-info I/O failed: {0}")]
    LastInfoIo(String),
}
