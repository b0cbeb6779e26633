use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("canonical encoding failed: {0}")]
    Encode(String),

    #[error("canonical decoding failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Crypto(#[from] zarb_crypto::CryptoError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
