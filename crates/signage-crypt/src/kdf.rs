//! Password-based key derivation (Argon2id v1.3).
//!
//! Used only to encrypt persisted entries at rest. The salt is fixed, so the
//! same password always yields the same key.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::error::{CryptError, Result};
use crate::secretbox::{SymmetricKey, KEY_BYTES};

/// Salt shared by every password derivation.
pub const KDF_SALT: [u8; 16] = [11, 91, 88, 93, 18, 54, 53, 96, 39, 37, 73, 3, 93, 55, 69, 21];

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// Derive a symmetric key from a password.
///
/// CPU and memory bound; async callers should run it on a blocking thread.
pub fn derive_password_key(password: &[u8], params: &KdfParams) -> Result<SymmetricKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_BYTES),
    )
    .map_err(|e| CryptError::KeyDerivation(e.to_string()))?;

    let mut out = [0u8; KEY_BYTES];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
        .hash_password_into(password, &KDF_SALT, &mut out)
        .map_err(|e| CryptError::KeyDerivation(e.to_string()))?;
    Ok(SymmetricKey::from_bytes(out))
}
