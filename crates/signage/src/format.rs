//! Envelope and body codecs of the proposal file format (version 2).
//!
//! ```text
//! u8  version
//! u16 authorCount
//! authorCount x sealed proposal key (suite.sealed_key_bytes() each)
//! [rest] secretbox(proposalKey, BODY)
//!
//! BODY:   author records, genesisValue(32), frames until end
//! PATCH:  secretbox(proposalKey, signed author record, frames until end)
//! ```
//!
//! Reading never stops at a bad author or frame; those become [`Issue`]s.

use signage_core::frame::GENESIS_VALUE_BYTES;
use signage_core::{
    Author, Decoded, Frame, Identity, Issue, Principal, Reader, SigningPublicKey, Writer,
};
use signage_crypt::{open, seal, CryptoSuite, ProposalKey, SymmetricKey};

use crate::error::{Result, SignageError};

/// Build the file envelope around an already-serialized body.
pub fn write_file(
    suite: &CryptoSuite,
    key: &ProposalKey,
    authors: &[Author],
    body: &[u8],
) -> Result<Vec<u8>> {
    let count =
        u16::try_from(authors.len()).map_err(|_| SignageError::TooManyAuthors(authors.len()))?;

    let mut w = Writer::new();
    w.write_u8(suite.format_version);
    w.write_u16(count);
    for author in authors {
        let slot = seal(key.as_bytes(), &author.crypt_public_key())?;
        debug_assert_eq!(slot.len(), suite.sealed_key_bytes());
        w.write_bytes(&slot);
    }
    w.write_bytes(&key.encrypt(body)?);
    Ok(w.into_bytes())
}

/// An opened file envelope.
pub struct OpenedFile {
    pub key: ProposalKey,
    pub author_count: u16,
    pub body: Vec<u8>,
}

/// Check the version, find the key slot sealed to `identity` and decrypt the
/// body. Every slot is consumed even after a match.
pub fn open_file(suite: &CryptoSuite, bytes: &[u8], identity: &Identity) -> Result<OpenedFile> {
    let mut r = Reader::new(bytes);
    let version = r.read_u8()?;
    if version != suite.format_version {
        return Err(SignageError::UnsupportedVersion {
            found: version,
            expected: suite.format_version,
        });
    }

    let author_count = r.read_u16()?;
    let mut key = None;
    for _ in 0..author_count {
        let slot = r.read_bytes(suite.sealed_key_bytes())?;
        if key.is_some() {
            continue;
        }
        if let Ok(raw) = open(slot, identity.crypt()) {
            key = Some(SymmetricKey::from_slice(&raw)?);
        }
    }
    let key = key.ok_or(SignageError::NoMatchingKeySlot)?;

    let body = key
        .decrypt(r.read_to_end())
        .map_err(|_| SignageError::BodyDecryption)?;

    Ok(OpenedFile {
        key,
        author_count,
        body,
    })
}

/// A decoded proposal body.
#[derive(Debug)]
pub struct Body {
    pub authors: Vec<Author>,
    pub genesis_value: [u8; GENESIS_VALUE_BYTES],
    pub frames: Vec<Frame>,
    pub issues: Vec<Issue>,
    /// Arena index of each on-wire author, `None` where the author was dropped.
    pub wire_to_arena: Vec<Option<u16>>,
}

impl Body {
    /// Number of author records that failed verification.
    pub fn dropped_authors(&self) -> usize {
        self.wire_to_arena.iter().filter(|i| i.is_none()).count()
    }
}

/// Serialize a proposal body. The author at `local` is re-signed with
/// `identity` as it is written; the others keep their stored attestation.
pub fn write_body(
    authors: &mut [Author],
    local: usize,
    identity: &Identity,
    genesis_value: &[u8; GENESIS_VALUE_BYTES],
    frames: &[Frame],
) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    for (i, author) in authors.iter_mut().enumerate() {
        if i == local {
            author.sign_and_write(identity, &mut w)?;
        } else {
            author.write_to(&mut w)?;
        }
    }
    w.write_bytes(genesis_value);
    for frame in frames {
        frame.write_to(&mut w)?;
    }
    Ok(w.into_bytes())
}

/// Decode a body holding `author_count` author records.
///
/// Authors with an invalid attestation are dropped, and so are the frames
/// that reference them. Surviving authors are renumbered densely.
pub fn read_body(bytes: &[u8], author_count: u16) -> Result<Body> {
    let mut r = Reader::new(bytes);
    let mut issues = Vec::new();
    let mut authors = Vec::with_capacity(author_count as usize);
    let mut remap: Vec<Option<u16>> = Vec::with_capacity(author_count as usize);

    for _ in 0..author_count {
        let unverified = Author::read_unverified(&mut r)?;
        match unverified.verify() {
            Ok(()) => {
                remap.push(Some(authors.len() as u16));
                authors.push(unverified.into_author());
            }
            Err(_) => {
                let a = unverified.author();
                issues.push(Issue::InvalidAuthor {
                    name: a.name().to_owned(),
                    mail: a.mail().to_owned(),
                });
                remap.push(None);
            }
        }
    }

    let genesis_value: [u8; GENESIS_VALUE_BYTES] = r.read_array()?;
    let map_index = |wire: u16| remap.get(wire as usize).copied().flatten();
    let frames = read_frames(&mut r, &authors, map_index, &mut issues)?;

    Ok(Body {
        authors,
        genesis_value,
        frames,
        issues,
        wire_to_arena: remap,
    })
}

/// Decode frames until the reader is exhausted.
pub fn read_frames<M>(
    r: &mut Reader<'_>,
    authors: &[Author],
    mut map_index: M,
    issues: &mut Vec<Issue>,
) -> Result<Vec<Frame>>
where
    M: FnMut(u16) -> Option<u16>,
{
    let mut lookup = |wire: u16| -> Option<(u16, SigningPublicKey)> {
        let arena = map_index(wire)?;
        let author = authors.get(arena as usize)?;
        Some((arena, author.signing_public_key()))
    };

    let mut frames = Vec::new();
    while !r.is_at_end() {
        match Frame::read_from(r, &mut lookup)? {
            Decoded::Frame(frame) => frames.push(frame),
            Decoded::Dropped(issue) => issues.push(issue),
        }
    }
    Ok(frames)
}

/// Build a patch: the re-signed author record followed by `frames`.
pub fn write_patch<'a>(
    key: &ProposalKey,
    author: &mut Author,
    identity: &Identity,
    frames: impl IntoIterator<Item = &'a Frame>,
) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    author.sign_and_write(identity, &mut w)?;
    for frame in frames {
        frame.write_to(&mut w)?;
    }
    Ok(key.encrypt(w.written())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use signage_core::frame::genesis_hash;

    fn people() -> (Identity, Identity) {
        (
            Identity::create("Ann", "ann@example.org", None),
            Identity::create("Ben", "ben@example.org", None),
        )
    }

    #[test]
    fn test_envelope_slots_and_version() {
        let suite = CryptoSuite::V2;
        let (ann, ben) = people();
        let authors = vec![ann.to_author().unwrap(), ben.to_author().unwrap()];
        let key = ProposalKey::generate();

        let file = write_file(&suite, &key, &authors, b"body").unwrap();
        assert_eq!(file[0], 2);
        assert_eq!(&file[1..3], &[0, 2]);
        assert_eq!(file.len(), 3 + 2 * 80 + 4 + 28);

        // Ben's key is in the second slot
        let opened = open_file(&suite, &file, &ben).unwrap();
        assert_eq!(opened.key, key);
        assert_eq!(opened.author_count, 2);
        assert_eq!(opened.body, b"body");

        let stranger = Identity::create("Cy", "cy@example.org", None);
        assert!(matches!(
            open_file(&suite, &file, &stranger),
            Err(SignageError::NoMatchingKeySlot)
        ));

        let mut wrong_version = file.clone();
        wrong_version[0] = 1;
        assert!(matches!(
            open_file(&suite, &wrong_version, &ann),
            Err(SignageError::UnsupportedVersion { found: 1, expected: 2 })
        ));

        let mut bad_body = file;
        let last = bad_body.len() - 1;
        bad_body[last] ^= 1;
        assert!(matches!(
            open_file(&suite, &bad_body, &ann),
            Err(SignageError::BodyDecryption)
        ));
    }

    #[test]
    fn test_body_drops_invalid_author_and_frames() {
        let (ann, ben) = people();
        let mut forged = ben.to_author().unwrap();
        forged.record_vote().unwrap();
        let mut authors = vec![forged, ann.to_author().unwrap()];

        let genesis_value = [3u8; 32];
        let g = genesis_hash(&genesis_value);
        let by_ben = Frame::addendum(g, 10, 0, "t", "m", &b"x"[..]).unwrap();
        let by_ann = Frame::addendum(g, 10, 1, "t", "m", &b"y"[..]).unwrap();

        let body = write_body(&mut authors, 1, &ann, &genesis_value, &[by_ben, by_ann.clone()]).unwrap();
        let decoded = read_body(&body, 2).unwrap();

        assert_eq!(decoded.authors.len(), 1);
        assert_eq!(decoded.authors[0].name(), "Ann");
        assert_eq!(decoded.wire_to_arena, vec![None, Some(0)]);
        assert_eq!(decoded.dropped_authors(), 1);
        assert_eq!(decoded.genesis_value, genesis_value);
        assert_eq!(decoded.frames.len(), 1);
        assert_eq!(decoded.frames[0].author, 0);
        assert_eq!(decoded.frames[0].hash, by_ann.hash);
        assert_eq!(
            decoded.issues,
            vec![
                Issue::InvalidAuthor {
                    name: "Ben".into(),
                    mail: "ben@example.org".into()
                },
                Issue::UnknownFrameAuthor { index: 0 },
            ]
        );
    }

    #[test]
    fn test_truncated_body_is_fatal() {
        let (ann, _) = people();
        let mut authors = vec![ann.to_author().unwrap()];
        let body = write_body(&mut authors, 0, &ann, &[0u8; 32], &[]).unwrap();
        assert!(read_body(&body[..body.len() - 1], 1).is_err());
        assert!(read_body(&body, 2).is_err());
    }
}
