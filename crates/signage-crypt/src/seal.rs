//! Anonymous public-key encryption ("sealed boxes").
//!
//! The sender generates an ephemeral X25519 key, agrees a secret with the
//! recipient's public key and derives a one-time ChaCha20-Poly1305 key and
//! nonce from it with Blake3. Output: `ephemeralPublic(32) ‖ ciphertext ‖ tag(16)`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use signage_core::crypto::{CryptKeypair, CryptPublicKey};
use x25519_dalek::{EphemeralSecret, PublicKey};

use crate::error::{CryptError, Result};
use crate::secretbox::{NONCE_BYTES, TAG_BYTES};

const KEY_CONTEXT: &str = "signage-seal-v2 key";
const NONCE_CONTEXT: &str = "signage-seal-v2 nonce";

/// Bytes added to the plaintext by [`seal`].
pub const SEAL_OVERHEAD_BYTES: usize = 32 + TAG_BYTES;

fn derive(
    shared: &[u8; 32],
    ephemeral: &CryptPublicKey,
    recipient: &CryptPublicKey,
) -> Result<(ChaCha20Poly1305, [u8; NONCE_BYTES])> {
    let mut hasher = blake3::Hasher::new_derive_key(KEY_CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral.as_bytes());
    hasher.update(recipient.as_bytes());
    let key = hasher.finalize();

    let mut hasher = blake3::Hasher::new_derive_key(NONCE_CONTEXT);
    hasher.update(ephemeral.as_bytes());
    hasher.update(recipient.as_bytes());
    let mut nonce = [0u8; NONCE_BYTES];
    nonce.copy_from_slice(&hasher.finalize().as_bytes()[..NONCE_BYTES]);

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptError::Encryption(e.to_string()))?;
    Ok((cipher, nonce))
}

/// Encrypt `plaintext` so only the holder of `recipient`'s secret can open it.
pub fn seal(plaintext: &[u8], recipient: &CryptPublicKey) -> Result<Vec<u8>> {
    let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
    let ephemeral = CryptPublicKey::from(PublicKey::from(&secret));
    let shared = secret.diffie_hellman(&recipient.to_dalek());

    let (cipher, nonce) = derive(shared.as_bytes(), &ephemeral, recipient)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(32 + ciphertext.len());
    out.extend_from_slice(ephemeral.as_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a sealed box with the recipient's keypair.
pub fn open(sealed: &[u8], recipient: &CryptKeypair) -> Result<Vec<u8>> {
    if sealed.len() < SEAL_OVERHEAD_BYTES {
        return Err(CryptError::Truncated {
            len: sealed.len(),
            min: SEAL_OVERHEAD_BYTES,
        });
    }
    let (eph, ciphertext) = sealed.split_at(32);
    let mut eph_bytes = [0u8; 32];
    eph_bytes.copy_from_slice(eph);
    let ephemeral = CryptPublicKey::from_bytes(eph_bytes);

    let shared = recipient.diffie_hellman(&ephemeral);
    let (cipher, nonce) = derive(&shared, &ephemeral, &recipient.public_key())?;
    cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext)
        .map_err(|_| CryptError::Decryption)
}
