//! Core error types.
//!
//! Wire-level failures surface as [`CodecError`]; endpoint-id text failures
//! as [`EidError`]. Advisory conditions that do not fail an operation travel
//! as bits on an [`crate::types::EventFlags`] word instead.

use crate::types::BpVal;

#[derive(Debug, thiserror::Error)]
pub enum EidError {
    #[error("EID must be at least 7 characters, got {0}")]
    TooShort(usize),

    #[error("EID cannot exceed {max} bytes, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error("EID must start with 'ipn:'")]
    WrongScheme,

    #[error("EID missing dotted node.service notation")]
    MissingDot,

    #[error("unable to parse EID node number")]
    BadNode,

    #[error("unable to parse EID service number")]
    BadService,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("block too short: {actual} bytes (minimum {min})")]
    TooShort { min: usize, actual: usize },

    #[error("unsupported bundle protocol version: {0}")]
    WrongVersion(u8),

    #[error("non-empty dictionary ({0} bytes) is not supported")]
    DictionaryPresent(BpVal),

    #[error("malformed field at offset {index}")]
    MalformedField { index: usize },

    #[error("bundle has too many extension blocks")]
    TooManyBlocks,

    #[error("invalid BIB cipher suite id: {0}")]
    UnknownCipherSuite(BpVal),

    #[error("invalid BIB security target type: {0}")]
    InvalidBibTarget(u8),

    #[error("invalid BIB security result type: {0}")]
    InvalidBibResult(u8),

    #[error("payload integrity check failed")]
    IntegrityCheckFailed,

    #[error("bundle addressed to foreign node {0}")]
    ForeignDestination(BpVal),

    #[error("bundle addressed to service {0}, not this channel")]
    WrongService(BpVal),

    #[error("custody requested without a custody transfer block")]
    MissingCustodyBlock,

    #[error("administrative record type {0:#04x} is not supported")]
    UnsupportedRecord(u8),

    #[error("unknown administrative record type {0:#04x}")]
    UnknownRecord(u8),

    #[error("bundle exceeds maximum length: {size} > {max}")]
    BundleTooLarge { size: usize, max: usize },

    #[error("bundle dropped: unrecognized block demanded processing")]
    BlockRequiredProcessing,

    #[error("bundle has no payload block")]
    MissingPayloadBlock,

    #[error("invalid EID: {0}")]
    Eid(#[from] EidError),
}

/// The system clock could not produce a time.
#[derive(Debug, thiserror::Error)]
#[error("system clock unavailable")]
pub struct ClockError;
