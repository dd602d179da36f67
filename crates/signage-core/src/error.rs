//! Error and issue types for Signage Core.
//!
//! Errors ([`CursorError`], [`CoreError`]) abort the operation that raised
//! them. Issues ([`Issue`]) describe recoverable content anomalies: the
//! offending record is dropped or the proposal is flagged, and parsing goes on.

use thiserror::Error;

use crate::types::FrameHash;

/// Errors from the binary cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("out of range at {position}: needed {needed} bytes, {available} available")]
    OutOfRange {
        position: usize,
        needed: usize,
        available: usize,
    },

    #[error("value {value} does not fit in {width} bytes")]
    ValueOutOfRange { value: i128, width: usize },

    #[error("integer width must be 1..=8 bytes, got {0}")]
    InvalidWidth(usize),

    #[error("string at {position} has no NUL terminator")]
    MissingTerminator { position: usize },

    #[error("string at {position} is not valid UTF-8")]
    InvalidUtf8 { position: usize },

    #[error("string contains an embedded NUL byte")]
    EmbeddedNul,
}

/// Core errors from identity, author and frame codecs.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("author {name} <{mail}> has an invalid attestation")]
    InvalidAuthorSignature { name: String, mail: String },

    #[error("stored public key does not match its secret key")]
    KeyMismatch,

    #[error("identity does not match the author being signed")]
    PrincipalMismatch,

    #[error("unknown frame type: {0}")]
    UnknownFrameType(u8),

    #[error("addendum content of {0} bytes exceeds the u32 length field")]
    ContentTooLarge(usize),

    #[error("author vote count overflows u32")]
    VoteCountOverflow,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// A recoverable anomaly found while reading or validating a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    #[error("author {name} <{mail}> has an invalid signature; dropping")]
    InvalidAuthor { name: String, mail: String },

    #[error("local identity is not among the proposal's authors")]
    LocalAuthorMissing,

    #[error("frame {stored} has an invalid hash; dropping")]
    CorruptFrameHash { stored: FrameHash },

    #[error("frame references unknown author {index}; dropping")]
    UnknownFrameAuthor { index: u16 },

    #[error("vote {frame} has an invalid signature; dropping")]
    InvalidVoteSignature { frame: FrameHash },

    #[error("chain is not linear")]
    ChainNotLinear,

    #[error("timestamp of frame {frame} goes backwards")]
    TimestampsNotAscending { frame: FrameHash },

    #[error("chain ends in the future ({timestamp} >= {now})")]
    ChainEndsInFuture { timestamp: i64, now: i64 },

    #[error("vote {vote} targets missing addendum {target}")]
    VoteTargetMissing { vote: FrameHash, target: FrameHash },

    #[error("addendum {addendum} has no votes")]
    AddendumNotVoted { addendum: FrameHash },

    #[error("author {author} voted twice on addendum {target}")]
    DoubleVote { target: FrameHash, author: u16 },

    #[error("author {author} declares {declared} votes but cast {actual}")]
    VoteCountMismatch {
        author: u16,
        declared: u32,
        actual: u32,
    },

    #[error("frames follow the unanimous acceptance of addendum {addendum}")]
    FrameAfterFinality { addendum: FrameHash },
}
