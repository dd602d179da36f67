//! Frames: the hash-linked entries of a proposal.
//!
//! Each frame names its predecessor by hash, carries a 56-bit millisecond
//! timestamp and the arena index of its author. The frame hash is the Blake3
//! digest of the serialized fields between the type tag and the hash itself;
//! a vote's signature follows the hash and is not covered by it.
//!
//! ```text
//! u8 frameType (1 = Addendum, 2 = Vote)
//! Addendum: prev(32) ts(i56) author(u16) title\0 mime\0 u32 len data(len) hash(32)
//! Vote:     prev(32) ts(i56) author(u16) target(32) u8 accept hash(32) signature(64)
//! ```

use bytes::Bytes;

use crate::crypto::{Digest, Signature, SigningKeypair, SigningPublicKey};
use crate::cursor::{Reader, Writer};
use crate::error::{CoreError, Issue, Result};
use crate::types::FrameHash;

pub const TAG_ADDENDUM: u8 = 1;
pub const TAG_VOTE: u8 = 2;

/// Width of the on-wire timestamp.
pub const TIMESTAMP_BYTES: usize = 7;

/// Timestamp of the virtual genesis frame.
pub const GENESIS_TIMESTAMP: i64 = i64::MIN + 1;

/// Length of the random genesis value.
pub const GENESIS_VALUE_BYTES: usize = 32;

/// Hash of the virtual genesis frame for a proposal's random genesis value.
pub fn genesis_hash(value: &[u8; GENESIS_VALUE_BYTES]) -> FrameHash {
    let mut w = Writer::with_capacity(GENESIS_VALUE_BYTES + 8);
    w.write_bytes(value);
    w.write_i64(GENESIS_TIMESTAMP);
    Digest::of(w.written()).into()
}

/// The payload of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBody {
    Addendum {
        title: String,
        mime_type: String,
        content: Bytes,
    },
    Vote {
        target: FrameHash,
        accept: bool,
        signature: Signature,
    },
}

/// A single chain entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub prev: FrameHash,
    pub timestamp: i64,
    /// Index into the proposal's author arena.
    pub author: u16,
    pub body: FrameBody,
    pub hash: FrameHash,
}

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Frame(Frame),
    /// The frame was fully consumed but is not usable.
    Dropped(Issue),
}

impl Frame {
    /// Build an addendum frame and compute its hash.
    pub fn addendum(
        prev: FrameHash,
        timestamp: i64,
        author: u16,
        title: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Result<Self> {
        let mut frame = Self {
            prev,
            timestamp,
            author,
            body: FrameBody::Addendum {
                title: title.into(),
                mime_type: mime_type.into(),
                content: content.into(),
            },
            hash: FrameHash::ZERO,
        };
        frame.hash = frame.compute_hash()?;
        Ok(frame)
    }

    /// Build a vote frame, computing its hash and signing it with `signer`.
    pub fn vote(
        prev: FrameHash,
        timestamp: i64,
        author: u16,
        target: FrameHash,
        accept: bool,
        signer: &SigningKeypair,
    ) -> Result<Self> {
        let mut frame = Self {
            prev,
            timestamp,
            author,
            body: FrameBody::Vote {
                target,
                accept,
                signature: Signature::ZERO,
            },
            hash: FrameHash::ZERO,
        };
        frame.hash = frame.compute_hash()?;
        if let FrameBody::Vote { signature, .. } = &mut frame.body {
            *signature = signer.sign(frame.hash.as_bytes());
        }
        Ok(frame)
    }

    pub fn tag(&self) -> u8 {
        match self.body {
            FrameBody::Addendum { .. } => TAG_ADDENDUM,
            FrameBody::Vote { .. } => TAG_VOTE,
        }
    }

    pub fn is_addendum(&self) -> bool {
        matches!(self.body, FrameBody::Addendum { .. })
    }

    pub fn is_vote(&self) -> bool {
        matches!(self.body, FrameBody::Vote { .. })
    }

    /// Target addendum hash, for votes.
    pub fn vote_target(&self) -> Option<FrameHash> {
        match self.body {
            FrameBody::Vote { target, .. } => Some(target),
            FrameBody::Addendum { .. } => None,
        }
    }

    /// Whether this is an accepting vote.
    pub fn is_accept(&self) -> bool {
        matches!(self.body, FrameBody::Vote { accept: true, .. })
    }

    fn write_hashed_fields(&self, w: &mut Writer) -> Result<()> {
        w.write_bytes(self.prev.as_bytes());
        w.write_int_be(self.timestamp, TIMESTAMP_BYTES)?;
        w.write_u16(self.author);
        match &self.body {
            FrameBody::Addendum {
                title,
                mime_type,
                content,
            } => {
                let len = u32::try_from(content.len())
                    .map_err(|_| CoreError::ContentTooLarge(content.len()))?;
                w.write_cstr(title)?;
                w.write_cstr(mime_type)?;
                w.write_u32(len);
                w.write_bytes(content);
            }
            FrameBody::Vote { target, accept, .. } => {
                w.write_bytes(target.as_bytes());
                w.write_u8(u8::from(*accept));
            }
        }
        Ok(())
    }

    /// Recompute the hash from the frame's fields.
    pub fn compute_hash(&self) -> Result<FrameHash> {
        let mut w = Writer::new();
        self.write_hashed_fields(&mut w)?;
        Ok(Digest::of(w.written()).into())
    }

    /// Serialize with the leading type tag.
    pub fn write_to(&self, w: &mut Writer) -> Result<()> {
        w.write_u8(self.tag());
        self.write_hashed_fields(w)?;
        w.write_bytes(self.hash.as_bytes());
        if let FrameBody::Vote { signature, .. } = &self.body {
            w.write_bytes(signature.as_bytes());
        }
        Ok(())
    }

    /// Decode one frame.
    ///
    /// `lookup` maps an on-wire author index to the arena index and signing
    /// key of a known author. Truncation and unknown tags are fatal; a hash
    /// mismatch, an unknown author or a bad vote signature drop the frame.
    pub fn read_from<F>(r: &mut Reader<'_>, mut lookup: F) -> Result<Decoded>
    where
        F: FnMut(u16) -> Option<(u16, SigningPublicKey)>,
    {
        let tag = r.read_u8()?;
        if tag != TAG_ADDENDUM && tag != TAG_VOTE {
            return Err(CoreError::UnknownFrameType(tag));
        }

        let start = r.position();
        let prev = FrameHash::from_bytes(r.read_array()?);
        let timestamp = r.read_int_be(TIMESTAMP_BYTES)?;
        let wire_author = r.read_u16()?;

        let partial = if tag == TAG_ADDENDUM {
            let title = r.read_cstr()?;
            let mime_type = r.read_cstr()?;
            let len = r.read_u32()? as usize;
            let content = Bytes::copy_from_slice(r.read_bytes(len)?);
            FrameBody::Addendum {
                title,
                mime_type,
                content,
            }
        } else {
            let target = FrameHash::from_bytes(r.read_array()?);
            let accept = r.read_u8()? == 1;
            FrameBody::Vote {
                target,
                accept,
                signature: Signature::ZERO,
            }
        };

        let actual: FrameHash = Digest::of(r.slice(start, r.position())?).into();
        let stored = FrameHash::from_bytes(r.read_array()?);
        let signature = if tag == TAG_VOTE {
            Some(Signature::from_bytes(r.read_array()?))
        } else {
            None
        };

        if actual != stored {
            return Ok(Decoded::Dropped(Issue::CorruptFrameHash { stored }));
        }

        let Some((author, signing_key)) = lookup(wire_author) else {
            return Ok(Decoded::Dropped(Issue::UnknownFrameAuthor { index: wire_author }));
        };

        let body = match (partial, signature) {
            (FrameBody::Vote { target, accept, .. }, Some(signature)) => {
                if signing_key.verify(stored.as_bytes(), &signature).is_err() {
                    return Ok(Decoded::Dropped(Issue::InvalidVoteSignature { frame: stored }));
                }
                FrameBody::Vote {
                    target,
                    accept,
                    signature,
                }
            }
            (body, _) => body,
        };

        Ok(Decoded::Frame(Frame {
            prev,
            timestamp,
            author,
            body,
            hash: stored,
        }))
    }
}
