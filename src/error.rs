//! Error types.

use thiserror::Error;

use crate::stream::StreamId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed stream id: expected 16 bytes, got {len}")]
    MalformedId { len: usize },

    #[error("invalid stream id: {0:?}")]
    ParseId(String),

    #[error("sequence exhausted within millisecond {ms}")]
    SequenceOverflow { ms: u64 },

    #[error("stream id {id} is not greater than last id {last}")]
    IdNotIncreasing { id: StreamId, last: StreamId },

    #[error("stream entry has no fields")]
    EmptyEntry,

    #[error("stale cursor: bound at generation {bound}, tree is at {current}")]
    StaleIterator { bound: u64, current: u64 },

    #[error("cursor is bound to a different tree")]
    ForeignTree,

    #[error("key decode: expected {expected} bytes, found {found}")]
    KeyDecode { expected: usize, found: usize },

    #[error("key decode: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("unknown seek operator: {0:?}")]
    UnknownSeekOp(String),
}
