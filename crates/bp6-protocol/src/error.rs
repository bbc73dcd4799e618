//! Channel-level error types.

use bp6_core::error::CodecError;
use bp6_storage::StoreError;

use crate::range_set::RangeSetError;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("operation timed out")]
    Timeout,

    #[error("invalid parameter: {0}")]
    Parameter(&'static str),

    #[error("active table wrapped; no room for a new bundle")]
    Overflow,

    #[error("bundle larger than caller buffer: {size} > {capacity}")]
    BundleTooLarge { size: usize, capacity: usize },

    #[error("payload larger than caller buffer: {size} > {capacity}")]
    PayloadTooLarge { size: usize, capacity: usize },

    #[error("storage service failure: {0}")]
    Store(#[from] StoreError),

    #[error("wire codec failure: {0}")]
    Codec(#[from] CodecError),

    #[error("custody bookkeeping failure: {0}")]
    RangeSet(#[from] RangeSetError),

    #[error("stored record corrupted: {0}")]
    Record(String),

    #[error("custody response could not be recorded")]
    Response,
}
