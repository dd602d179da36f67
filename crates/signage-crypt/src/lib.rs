//! # Signage Crypt
//!
//! Encryption for Signage proposals.
//!
//! ## Encryption Model
//!
//! 1. **Proposal Key**: a random symmetric key (ChaCha20-Poly1305) that
//!    encrypts the proposal body and every patch
//! 2. **Sealed Keys**: the proposal key is sealed to each author's X25519
//!    public key and stored in the file header
//! 3. **Password Key**: Argon2id-derived key for entries persisted at rest

pub mod error;
pub mod kdf;
pub mod seal;
pub mod secretbox;
pub mod suite;

pub use error::{CryptError, Result};
pub use kdf::{derive_password_key, KdfParams, KDF_SALT};
pub use seal::{open, seal, SEAL_OVERHEAD_BYTES};
pub use secretbox::{ProposalKey, SymmetricKey, SECRETBOX_OVERHEAD_BYTES};
pub use suite::CryptoSuite;
