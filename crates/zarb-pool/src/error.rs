use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error(transparent)]
    Rejected(#[from] zarb_types::TypesError),

    #[error("transaction rejected by checker: {0}")]
    CheckFailed(String),
}
