//! Test fixtures and helpers.
//!
//! Common setup code for unit and integration tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use signage_core::{Author, Clock, CryptKeypair, Identity, IdentityKeys, Issue, SigningKeypair};
use signage_crypt::KdfParams;

/// Argon2id parameters cheap enough for tests.
pub const FAST_KDF: KdfParams = KdfParams {
    memory_kib: 64,
    iterations: 1,
    parallelism: 1,
};

/// A test fixture holding one identity.
pub struct TestFixture {
    pub identity: Identity,
}

impl TestFixture {
    /// Create a fixture with freshly generated keys.
    pub fn new(name: &str, mail: &str) -> Self {
        Self {
            identity: Identity::create(name, mail, None),
        }
    }

    /// Create with deterministic keys derived from `seed`.
    pub fn with_seed(name: &str, mail: &str, seed: [u8; 32]) -> Self {
        let mut crypt_secret = seed;
        crypt_secret[31] ^= 0xff;
        let keys = IdentityKeys {
            signing: SigningKeypair::from_seed(&seed),
            crypt: CryptKeypair::from_secret(crypt_secret),
        };
        Self {
            identity: Identity::create(name, mail, Some(keys)),
        }
    }

    /// The self-attested author record of this identity.
    pub fn author(&self) -> Author {
        self.identity
            .to_author()
            .expect("fixture identity attests")
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0x5a;
            TestFixture::with_seed(
                &format!("party{i}"),
                &format!("party{i}@example.org"),
                seed,
            )
        })
        .collect()
}

/// A clock that advances one millisecond on every read.
#[derive(Debug)]
pub struct TickingClock {
    now: AtomicI64,
}

impl TickingClock {
    pub fn starting_at(millis: i64) -> Self {
        Self {
            now: AtomicI64::new(millis),
        }
    }
}

impl Default for TickingClock {
    /// Starts at 2023-11-14T22:13:20Z.
    fn default() -> Self {
        Self::starting_at(1_700_000_000_000)
    }
}

impl Clock for TickingClock {
    fn now_millis(&self) -> i64 {
        self.now.fetch_add(1, Ordering::SeqCst)
    }
}

/// Collects the issues a processor reports.
#[derive(Debug, Clone, Default)]
pub struct IssueLog {
    issues: Arc<Mutex<Vec<Issue>>>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that appends to this log.
    pub fn handler(&self) -> Box<dyn FnMut(&Issue) + Send> {
        let issues = Arc::clone(&self.issues);
        Box::new(move |issue| {
            if let Ok(mut issues) = issues.lock() {
                issues.push(issue.clone());
            }
        })
    }

    /// Snapshot of the collected issues, in report order.
    pub fn issues(&self) -> Vec<Issue> {
        self.issues.lock().map(|i| i.clone()).unwrap_or_default()
    }
}
