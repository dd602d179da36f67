//! The fixed algorithm suite of a file format version.

use signage_core::crypto::{HASH_BYTES, PUBLIC_KEY_BYTES, SECRET_KEY_BYTES, SIGNATURE_BYTES};

use crate::seal::SEAL_OVERHEAD_BYTES;
use crate::secretbox::{KEY_BYTES, SECRETBOX_OVERHEAD_BYTES};

/// Byte lengths and version number of one algorithm suite.
///
/// Blake3 / Ed25519 / X25519 / ChaCha20-Poly1305 for [`CryptoSuite::V2`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoSuite {
    pub format_version: u8,
    pub hash_bytes: usize,
    pub public_key_bytes: usize,
    pub secret_key_bytes: usize,
    pub signature_bytes: usize,
    pub proposal_key_bytes: usize,
    pub seal_overhead_bytes: usize,
    pub secretbox_overhead_bytes: usize,
}

impl CryptoSuite {
    pub const V2: Self = Self {
        format_version: 2,
        hash_bytes: HASH_BYTES,
        public_key_bytes: PUBLIC_KEY_BYTES,
        secret_key_bytes: SECRET_KEY_BYTES,
        signature_bytes: SIGNATURE_BYTES,
        proposal_key_bytes: KEY_BYTES,
        seal_overhead_bytes: SEAL_OVERHEAD_BYTES,
        secretbox_overhead_bytes: SECRETBOX_OVERHEAD_BYTES,
    };

    /// Length of one sealed proposal-key slot in a file header.
    pub const fn sealed_key_bytes(&self) -> usize {
        self.proposal_key_bytes + self.seal_overhead_bytes
    }
}

impl Default for CryptoSuite {
    fn default() -> Self {
        Self::V2
    }
}
