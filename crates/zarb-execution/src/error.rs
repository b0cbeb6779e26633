use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("invalid sequence: expected {expected}, got {got}")]
    InvalidSequence { expected: u32, got: u32 },

    #[error("insufficient funds: balance {balance} is less than required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("duplicated mintbase transaction")]
    DuplicatedMintbase,

    #[error("invalid sortition proof")]
    InvalidSortitionProof,

    #[error("sortition replay: validator already joined at this height")]
    SortitionReplay,

    #[error("unknown account")]
    UnknownAccount,

    #[error("invalid transaction kind for this context")]
    InvalidTxKindForContext,

    #[error("fee {fee} is below the minimum {min_fee}")]
    FeeTooLow { fee: i64, min_fee: i64 },

    #[error("subsidy amount {got} does not match expected {expected}")]
    InvalidSubsidyAmount { expected: i64, got: i64 },

    #[error(transparent)]
    Types(#[from] zarb_types::TypesError),

    #[error(transparent)]
    Store(#[from] zarb_store::StoreError),
}
