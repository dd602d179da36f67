//! # Signage Core
//!
//! Pure primitives for Signage proposals: the binary cursor, signing keys,
//! identities and authors, frames, and chain validation.
//!
//! This crate contains no I/O and no encryption. It is computation over the
//! data structures that make up a proposal.
//!
//! ## Key Types
//!
//! - [`Identity`] / [`Author`] - Local principal and its public projection
//! - [`Frame`] - A hash-linked addendum or vote
//! - [`Proposal`] - Author arena plus ordered frames
//! - [`Issue`] - A recoverable anomaly found while reading a proposal

pub mod chain;
pub mod clock;
pub mod crypto;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod identity;
pub mod types;

pub use chain::{order_frames, validate_chain, ChainReport, Proposal};
pub use clock::{Clock, SystemClock};
pub use crypto::{
    random_array, random_bytes, CryptKeypair, CryptPublicKey, Digest, Signature, SigningKeypair,
    SigningPublicKey,
};
pub use cursor::{Reader, Writer};
pub use error::{CoreError, CursorError, Issue};
pub use frame::{genesis_hash, Decoded, Frame, FrameBody};
pub use identity::{same_principal, Author, Identity, IdentityKeys, Principal, UnverifiedAuthor};
pub use types::FrameHash;
