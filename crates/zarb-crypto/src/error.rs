use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid public key bytes")]
    InvalidPublicKey,

    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid signature bytes")]
    InvalidSignature,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("aggregate signature verification failed")]
    AggregateVerificationFailed,

    #[error("cannot aggregate an empty signature set")]
    EmptyAggregate,

    #[error("invalid VRF proof")]
    InvalidVrfProof,

    #[error("keyfile passphrase is incorrect")]
    WrongPassphrase,

    #[error("keyfile is malformed: {0}")]
    MalformedKeyfile(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
