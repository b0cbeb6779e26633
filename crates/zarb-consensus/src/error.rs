use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("certificate committers do not match the current committee, in order")]
    CommittersMismatch,

    #[error("absentee validator number {0} is not among the committers")]
    AbsenteeNotInCommitters(u32),

    #[error("duplicate absentee validator number {0}")]
    DuplicateAbsentee(u32),

    #[error("absentees are not sorted ascending")]
    AbsenteesNotSorted,

    #[error("signer stake {signer_stake} does not reach the required supermajority {required}")]
    BelowSupermajority { signer_stake: i64, required: i64 },

    #[error("unknown validator number {0} referenced by the committee")]
    UnknownValidatorNumber(u32),

    #[error("aggregated signature does not verify against the signer set")]
    InvalidAggregateSignature,

    #[error("certificate references block {got} but the current block is {expected}")]
    WrongBlockHash { expected: String, got: String },

    #[error(transparent)]
    Types(#[from] zarb_types::TypesError),

    #[error(transparent)]
    Crypto(#[from] zarb_crypto::CryptoError),
}
