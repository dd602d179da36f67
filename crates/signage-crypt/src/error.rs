//! Error types for Signage encryption.

use thiserror::Error;

/// Errors that can occur while encrypting, decrypting or deriving keys.
#[derive(Debug, Error)]
pub enum CryptError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication failed or the ciphertext is malformed.
    #[error("decryption failed")]
    Decryption,

    /// Ciphertext shorter than the fixed overhead.
    #[error("ciphertext of {len} bytes is shorter than the {min} byte overhead")]
    Truncated { len: usize, min: usize },

    /// Key derivation error.
    #[error("key derivation error: {0}")]
    KeyDerivation(String),
}

/// Result type for encryption operations.
pub type Result<T> = std::result::Result<T, CryptError>;
