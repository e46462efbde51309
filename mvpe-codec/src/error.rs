//! Codec and pool error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding MYRA payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("message type not registered: {0}")]
    UnregisteredMessage(&'static str),

    #[error("unknown message id: {0}")]
    UnknownMessageId(u16),

    #[error("unsupported field type: {0}")]
    UnsupportedField(&'static str),

    #[error("truncated payload: need {needed} bytes, {available} available")]
    TruncatedPayload { needed: usize, available: usize },

    #[error("corrupted payload: checksum mismatch (expected {expected:#x}, got {actual:#x})")]
    CorruptedPayload { expected: u32, actual: u32 },

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("payload overflow: need {needed} bytes, {available} available")]
    PayloadOverflow { needed: usize, available: usize },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("message id {0} is already registered")]
    DuplicateMessageId(u16),

    #[error("message type {0} is already registered")]
    DuplicateMessageType(&'static str),

    #[error("decoded message is not a {expected} (method id {id})")]
    UnexpectedMessage { expected: &'static str, id: u16 },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors from the segment pool.
///
/// Pool misuse is largely unrepresentable: a lease can only be returned
/// to the pool that issued it, so there is no foreign-release variant.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("segment pool is closed")]
    Closed,
}
