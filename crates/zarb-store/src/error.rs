use thiserror::Error;

/// Store I/O is opaque to the rest of the core: the state machine treats
/// any `StoreError` during commit as fatal and halts rather than continue
/// on ambiguous state.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("not found")]
    NotFound,
}
