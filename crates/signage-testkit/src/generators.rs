//! Proptest generators for property-based testing.

use proptest::prelude::*;

use signage_core::{CryptKeypair, Frame, FrameHash, Identity, IdentityKeys, SigningKeypair};

/// Generate an identity with deterministic keys.
pub fn identity() -> impl Strategy<Value = Identity> {
    ("[A-Z][a-z]{1,11}", any::<[u8; 32]>(), any::<[u8; 32]>()).prop_map(
        |(name, seed, secret)| {
            let mail = format!("{}@example.org", name.to_lowercase());
            let keys = IdentityKeys {
                signing: SigningKeypair::from_seed(&seed),
                crypt: CryptKeypair::from_secret(secret),
            };
            Identity::create(name, mail, Some(keys))
        },
    )
}

/// Generate a random FrameHash.
pub fn frame_hash() -> impl Strategy<Value = FrameHash> {
    any::<[u8; 32]>().prop_map(FrameHash::from_bytes)
}

/// Generate a non-negative timestamp that fits in 56 bits.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..(1i64 << 55)
}

/// Generate an addendum title.
pub fn title() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ,.!?-]{0,40}".prop_map(String::from)
}

/// Generate a MIME type.
pub fn mime_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("text/plain".to_string()),
        Just("text/markdown".to_string()),
        Just("application/pdf".to_string()),
        "[a-z]{1,8}/[a-z0-9.+-]{1,16}".prop_map(String::from),
    ]
}

/// Generate content bytes of specified max length.
pub fn content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for generating an addendum frame.
#[derive(Debug, Clone)]
pub struct AddendumParams {
    pub prev: FrameHash,
    pub timestamp: i64,
    pub author: u16,
    pub title: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl Arbitrary for AddendumParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            frame_hash(),
            timestamp(),
            0u16..8,
            title(),
            mime_type(),
            content(1000),
        )
            .prop_map(|(prev, timestamp, author, title, mime_type, content)| AddendumParams {
                prev,
                timestamp,
                author,
                title,
                mime_type,
                content,
            })
            .boxed()
    }
}

/// Build an addendum frame from parameters.
pub fn addendum_from_params(params: &AddendumParams) -> Frame {
    Frame::addendum(
        params.prev,
        params.timestamp,
        params.author,
        &params.title,
        &params.mime_type,
        params.content.clone(),
    )
    .expect("generated addendum encodes")
}
