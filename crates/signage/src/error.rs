//! Error types for the file processor and vault.

use signage_core::{CoreError, CursorError};
use signage_crypt::CryptError;
use signage_store::{EntryKind, StoreError};
use thiserror::Error;

/// Errors that abort a Signage operation.
#[derive(Debug, Error)]
pub enum SignageError {
    /// Codec error from core.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Truncated or malformed byte stream.
    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    /// Encryption error.
    #[error("encryption error: {0}")]
    Crypt(#[from] CryptError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("unsupported file version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },

    /// None of the sealed key slots opens with the local identity.
    #[error("no key slot can be opened by this identity")]
    NoMatchingKeySlot,

    #[error("proposal body failed to decrypt")]
    BodyDecryption,

    #[error("patch failed to decrypt")]
    PatchDecryption,

    #[error("no proposal is loaded")]
    NotLoaded,

    #[error("proposal has no addendum to vote on")]
    NoAddendum,

    #[error("already voted on the latest addendum")]
    AlreadyVoted,

    #[error("local identity is not an author of this proposal")]
    IdentityNotAnAuthor,

    #[error("patch author is not an author of this proposal")]
    UnknownPatchAuthor,

    /// Frame hashes cover the on-wire author index, so a proposal that lost
    /// authors on load cannot be written again.
    #[error("{0} author record(s) failed verification on load; the proposal is read-only")]
    AuthorsDropped(usize),

    #[error("{0} authors exceed the limit of 65535")]
    TooManyAuthors(usize),

    #[error("{kind} entry {name:?} is encrypted; a password is required")]
    PasswordRequired { kind: EntryKind, name: String },

    #[error("{kind} entry {name:?} not found")]
    EntryNotFound { kind: EntryKind, name: String },

    #[error("key derivation task failed: {0}")]
    Task(String),
}

/// Result type for Signage operations.
pub type Result<T> = std::result::Result<T, SignageError>;
