//! EntryStore trait: the abstract interface for named-entry persistence.
//!
//! Entries are opaque byte blobs addressed by `(kind, name)`, each with a
//! small metadata record. The vault decides what goes inside.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// The namespace an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryKind {
    Identity,
    Author,
    Proposal,
}

impl EntryKind {
    pub const ALL: [EntryKind; 3] = [EntryKind::Identity, EntryKind::Author, EntryKind::Proposal];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Identity => "identity",
            EntryKind::Author => "author",
            EntryKind::Proposal => "proposal",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown entry kind: {}", s)))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stored alongside an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Whether `data` is encrypted under a password-derived key.
    pub encrypted: bool,
}

/// A stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub meta: EntryMeta,
    pub data: Bytes,
}

/// The EntryStore trait: async interface for named-entry persistence.
///
/// `put` overwrites an existing entry of the same kind and name.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Get an entry, or None if absent.
    async fn get(&self, kind: EntryKind, name: &str) -> Result<Option<Entry>>;

    /// Insert or replace an entry.
    async fn put(&self, kind: EntryKind, name: &str, meta: EntryMeta, data: &[u8]) -> Result<()>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, kind: EntryKind, name: &str) -> Result<bool>;

    /// All entry names of `kind` with their metadata.
    async fn list(&self, kind: EntryKind) -> Result<BTreeMap<String, EntryMeta>>;

    /// Whether an entry exists.
    async fn contains(&self, kind: EntryKind, name: &str) -> Result<bool> {
        Ok(self.get(kind, name).await?.is_some())
    }
}
