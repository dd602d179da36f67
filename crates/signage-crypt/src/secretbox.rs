//! Authenticated symmetric encryption.
//!
//! ChaCha20-Poly1305 with a fresh random nonce per message. The output is
//! `nonce(12) ‖ ciphertext ‖ tag(16)`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use signage_core::crypto::random_array;
use std::fmt;

use crate::error::{CryptError, Result};

pub const KEY_BYTES: usize = 32;
pub const NONCE_BYTES: usize = 12;
pub const TAG_BYTES: usize = 16;

/// Bytes added to the plaintext by [`SymmetricKey::encrypt`].
pub const SECRETBOX_OVERHEAD_BYTES: usize = NONCE_BYTES + TAG_BYTES;

/// A 256-bit ChaCha20-Poly1305 key.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_BYTES]);

/// The per-proposal content key.
pub type ProposalKey = SymmetricKey;

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        Self(random_array())
    }

    pub const fn from_bytes(bytes: [u8; KEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly [`KEY_BYTES`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_BYTES] = bytes.try_into().map_err(|_| CryptError::Decryption)?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.0).map_err(|e| CryptError::Encryption(e.to_string()))
    }

    /// Encrypt under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce: [u8; NONCE_BYTES] = random_array();
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_BYTES + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt `nonce ‖ ciphertext ‖ tag`.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < SECRETBOX_OVERHEAD_BYTES {
            return Err(CryptError::Truncated {
                len: data.len(),
                min: SECRETBOX_OVERHEAD_BYTES,
            });
        }
        let (nonce, ciphertext) = data.split_at(NONCE_BYTES);
        self.cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptError::Decryption)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}
