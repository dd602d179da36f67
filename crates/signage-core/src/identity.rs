//! Identities and authors.
//!
//! An [`Identity`] is the local principal and owns both private keys. An
//! [`Author`] is the public projection stored in a proposal, carrying a vote
//! count and a self-attestation: an Ed25519 signature by the author's own key
//! over the digest of its serialized public fields.
//!
//! Wire layout of an author record:
//!
//! ```text
//! name\0 mail\0 signPub(32) cryptPub(32) u32 voteCount signature(64)
//! ```

use crate::crypto::{
    CryptKeypair, CryptPublicKey, Digest, Signature, SigningKeypair, SigningPublicKey,
};
use crate::cursor::{Reader, Writer};
use crate::error::{CoreError, Result};

/// Anything that names a principal by name, mail and public keys.
pub trait Principal {
    fn name(&self) -> &str;
    fn mail(&self) -> &str;
    fn signing_public_key(&self) -> SigningPublicKey;
    fn crypt_public_key(&self) -> CryptPublicKey;
}

/// Whether two principals are the same person: equal name, mail and both
/// public keys.
pub fn same_principal(a: &(impl Principal + ?Sized), b: &(impl Principal + ?Sized)) -> bool {
    a.name() == b.name()
        && a.mail() == b.mail()
        && a.signing_public_key() == b.signing_public_key()
        && a.crypt_public_key() == b.crypt_public_key()
}

/// Both keypairs of an identity. Secrets are always present.
#[derive(Debug, Clone)]
pub struct IdentityKeys {
    pub signing: SigningKeypair,
    pub crypt: CryptKeypair,
}

impl IdentityKeys {
    /// Generate fresh signing and encryption keypairs.
    pub fn generate() -> Self {
        Self {
            signing: SigningKeypair::generate(),
            crypt: CryptKeypair::generate(),
        }
    }
}

/// The local principal.
#[derive(Debug, Clone)]
pub struct Identity {
    name: String,
    mail: String,
    keys: IdentityKeys,
}

impl Identity {
    /// Create an identity, generating keys unless `keys` is given.
    pub fn create(
        name: impl Into<String>,
        mail: impl Into<String>,
        keys: Option<IdentityKeys>,
    ) -> Self {
        Self {
            name: name.into(),
            mail: mail.into(),
            keys: keys.unwrap_or_else(IdentityKeys::generate),
        }
    }

    pub fn keys(&self) -> &IdentityKeys {
        &self.keys
    }

    pub fn signing(&self) -> &SigningKeypair {
        &self.keys.signing
    }

    pub fn crypt(&self) -> &CryptKeypair {
        &self.keys.crypt
    }

    /// The self-attested public projection, with a vote count of zero.
    pub fn to_author(&self) -> Result<Author> {
        let mut author = Author {
            name: self.name.clone(),
            mail: self.mail.clone(),
            signing_key: self.signing_public_key(),
            crypt_key: self.crypt_public_key(),
            vote_count: 0,
            signature: Signature::ZERO,
        };
        author.attest(self)?;
        Ok(author)
    }

    /// Serialize including both secret keys.
    ///
    /// ```text
    /// name\0 mail\0 signPub(32) signSecret(32) cryptPub(32) cryptSecret(32)
    /// ```
    pub fn write_to(&self, w: &mut Writer) -> Result<()> {
        w.write_cstr(&self.name)?;
        w.write_cstr(&self.mail)?;
        w.write_bytes(self.signing_public_key().as_bytes());
        w.write_bytes(&self.keys.signing.seed());
        w.write_bytes(self.crypt_public_key().as_bytes());
        w.write_bytes(&self.keys.crypt.secret_bytes());
        Ok(())
    }

    /// Deserialize an identity. Public keys are re-derived from the secrets
    /// and must match the stored ones.
    pub fn read_from(r: &mut Reader<'_>) -> Result<Self> {
        let name = r.read_cstr()?;
        let mail = r.read_cstr()?;
        let sign_pub = SigningPublicKey::from_bytes(r.read_array()?);
        let signing = SigningKeypair::from_seed(&r.read_array()?);
        let crypt_pub = CryptPublicKey::from_bytes(r.read_array()?);
        let crypt = CryptKeypair::from_secret(r.read_array()?);

        if signing.public_key() != sign_pub || crypt.public_key() != crypt_pub {
            return Err(CoreError::KeyMismatch);
        }

        Ok(Self {
            name,
            mail,
            keys: IdentityKeys { signing, crypt },
        })
    }
}

impl Principal for Identity {
    fn name(&self) -> &str {
        &self.name
    }

    fn mail(&self) -> &str {
        &self.mail
    }

    fn signing_public_key(&self) -> SigningPublicKey {
        self.keys.signing.public_key()
    }

    fn crypt_public_key(&self) -> CryptPublicKey {
        self.keys.crypt.public_key()
    }
}

/// A co-author of a proposal as stored in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    name: String,
    mail: String,
    signing_key: SigningPublicKey,
    crypt_key: CryptPublicKey,
    vote_count: u32,
    signature: Signature,
}

impl Author {
    pub fn vote_count(&self) -> u32 {
        self.vote_count
    }

    /// The stored attestation.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Count one more vote. The attestation goes stale until re-signed.
    pub fn record_vote(&mut self) -> Result<()> {
        self.vote_count = self
            .vote_count
            .checked_add(1)
            .ok_or(CoreError::VoteCountOverflow)?;
        Ok(())
    }

    fn write_fields(&self, w: &mut Writer) -> Result<()> {
        w.write_cstr(&self.name)?;
        w.write_cstr(&self.mail)?;
        w.write_bytes(self.signing_key.as_bytes());
        w.write_bytes(self.crypt_key.as_bytes());
        w.write_u32(self.vote_count);
        Ok(())
    }

    fn attestation_digest(&self) -> Result<Digest> {
        let mut w = Writer::with_capacity(128);
        self.write_fields(&mut w)?;
        Ok(Digest::of(w.written()))
    }

    /// Re-sign the public fields with `identity`'s signing key.
    pub fn attest(&mut self, identity: &Identity) -> Result<()> {
        if !same_principal(self, identity) {
            return Err(CoreError::PrincipalMismatch);
        }
        let digest = self.attestation_digest()?;
        self.signature = identity.signing().sign(digest.as_bytes());
        Ok(())
    }

    /// Write the public fields followed by the stored attestation.
    pub fn write_to(&self, w: &mut Writer) -> Result<()> {
        self.write_fields(w)?;
        w.write_bytes(self.signature.as_bytes());
        Ok(())
    }

    /// Re-sign with `identity`, store the new attestation, then write.
    pub fn sign_and_write(&mut self, identity: &Identity, w: &mut Writer) -> Result<()> {
        self.attest(identity)?;
        self.write_to(w)
    }

    /// Read and verify an author record.
    pub fn read_from(r: &mut Reader<'_>) -> Result<Self> {
        let unverified = Self::read_unverified(r)?;
        unverified.verify()?;
        Ok(unverified.into_author())
    }

    /// Read an author record without checking its attestation.
    ///
    /// Cursor errors are returned; an invalid attestation is only detected by
    /// [`UnverifiedAuthor::verify`], so the caller can skip this record and
    /// keep parsing.
    pub fn read_unverified(r: &mut Reader<'_>) -> Result<UnverifiedAuthor> {
        let start = r.position();
        let name = r.read_cstr()?;
        let mail = r.read_cstr()?;
        let signing_key = SigningPublicKey::from_bytes(r.read_array()?);
        let crypt_key = CryptPublicKey::from_bytes(r.read_array()?);
        let vote_count = r.read_u32()?;
        let digest = Digest::of(r.slice(start, r.position())?);
        let signature = Signature::from_bytes(r.read_array()?);

        Ok(UnverifiedAuthor {
            author: Author {
                name,
                mail,
                signing_key,
                crypt_key,
                vote_count,
                signature,
            },
            digest,
        })
    }
}

impl Principal for Author {
    fn name(&self) -> &str {
        &self.name
    }

    fn mail(&self) -> &str {
        &self.mail
    }

    fn signing_public_key(&self) -> SigningPublicKey {
        self.signing_key
    }

    fn crypt_public_key(&self) -> CryptPublicKey {
        self.crypt_key
    }
}

/// An author record read from the wire whose attestation is not yet checked.
#[derive(Debug, Clone)]
pub struct UnverifiedAuthor {
    author: Author,
    digest: Digest,
}

impl UnverifiedAuthor {
    /// The parsed record. Do not trust it before [`verify`](Self::verify).
    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Check the attestation against the digest of the exact bytes parsed.
    pub fn verify(&self) -> Result<()> {
        self.author
            .signing_key
            .verify(self.digest.as_bytes(), &self.author.signature)
            .map_err(|_| CoreError::InvalidAuthorSignature {
                name: self.author.name.clone(),
                mail: self.author.mail.clone(),
            })
    }

    pub fn into_author(self) -> Author {
        self.author
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::create("Alice", "alice@example.org", None)
    }

    #[test]
    fn test_author_roundtrip_verifies() {
        let id = alice();
        let author = id.to_author().unwrap();
        assert_eq!(author.vote_count(), 0);
        assert!(same_principal(&id, &author));

        let mut w = Writer::new();
        author.write_to(&mut w).unwrap();
        let bytes = w.take();

        let mut r = Reader::new(&bytes);
        let decoded = Author::read_from(&mut r).unwrap();
        assert_eq!(decoded, author);
        assert!(r.is_at_end());
    }

    #[test]
    fn test_stale_attestation_rejected() {
        let id = alice();
        let mut author = id.to_author().unwrap();
        author.record_vote().unwrap();

        let mut w = Writer::new();
        author.write_to(&mut w).unwrap();
        let bytes = w.take();
        let err = Author::read_from(&mut Reader::new(&bytes)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAuthorSignature { .. }));

        // Re-signing fixes it
        let mut w = Writer::new();
        author.sign_and_write(&id, &mut w).unwrap();
        let bytes = w.take();
        let decoded = Author::read_from(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(decoded.vote_count(), 1);
    }

    #[test]
    fn test_vote_count_overflow() {
        let mut author = alice().to_author().unwrap();
        author.vote_count = u32::MAX;
        assert!(matches!(author.record_vote(), Err(CoreError::VoteCountOverflow)));
        assert_eq!(author.vote_count(), u32::MAX);
    }

    #[test]
    fn test_flipped_byte_rejected() {
        let author = alice().to_author().unwrap();
        let mut w = Writer::new();
        author.write_to(&mut w).unwrap();
        let mut bytes = w.take();
        // Inside the signing key
        bytes[30] ^= 0x01;

        let mut r = Reader::new(&bytes);
        let unverified = Author::read_unverified(&mut r).unwrap();
        assert!(r.is_at_end());
        assert!(unverified.verify().is_err());
    }

    #[test]
    fn test_sign_with_other_identity_fails() {
        let mut author = alice().to_author().unwrap();
        let bob = Identity::create("Bob", "bob@example.org", None);
        let mut w = Writer::new();
        assert!(matches!(
            author.sign_and_write(&bob, &mut w),
            Err(CoreError::PrincipalMismatch)
        ));
    }

    #[test]
    fn test_same_principal_requires_all_fields() {
        let keys = IdentityKeys::generate();
        let a = Identity::create("Alice", "alice@example.org", Some(keys.clone()));
        let b = Identity::create("Alice", "alice@example.org", Some(keys.clone()));
        let renamed = Identity::create("Alicia", "alice@example.org", Some(keys));
        assert!(same_principal(&a, &b));
        assert!(!same_principal(&a, &renamed));
        assert!(!same_principal(&a, &alice()));
    }

    #[test]
    fn test_identity_roundtrip() {
        let id = alice();
        let mut w = Writer::new();
        id.write_to(&mut w).unwrap();
        let bytes = w.take();
        assert_eq!(bytes.len(), "Alice".len() + 1 + "alice@example.org".len() + 1 + 128);

        let restored = Identity::read_from(&mut Reader::new(&bytes)).unwrap();
        assert!(same_principal(&id, &restored));
        assert_eq!(restored.signing().seed(), id.signing().seed());
    }

    #[test]
    fn test_identity_key_mismatch() {
        let id = alice();
        let mut w = Writer::new();
        id.write_to(&mut w).unwrap();
        let mut bytes = w.take();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        assert!(matches!(
            Identity::read_from(&mut Reader::new(&bytes)),
            Err(CoreError::KeyMismatch)
        ));
    }
}
