//! Strong type definitions for Signage.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Digest;

/// A 32-byte frame hash, the Blake3 digest of a frame's serialized fields.
///
/// Frames link to their predecessor by this value. The first frame of a
/// proposal links to the genesis hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameHash(pub [u8; 32]);

impl FrameHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The zero hash (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for FrameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for FrameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl From<Digest> for FrameHash {
    fn from(d: Digest) -> Self {
        Self(d.0)
    }
}

impl From<[u8; 32]> for FrameHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for FrameHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_hash_hex_roundtrip() {
        let h = FrameHash::from_bytes([0x42; 32]);
        assert_eq!(FrameHash::from_hex(&h.to_hex()).unwrap(), h);
        assert!(FrameHash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_frame_hash_display() {
        let h = FrameHash::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", h), "abababababababab");
        assert!(format!("{:?}", h).starts_with("FrameHash("));
    }
}
