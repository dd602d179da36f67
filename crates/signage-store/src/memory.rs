//! In-memory implementation of the EntryStore trait.
//!
//! Same semantics as SQLite but nothing is persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{Entry, EntryKind, EntryMeta, EntryStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<HashMap<EntryKind, BTreeMap<String, Entry>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Task(format!("lock poisoned: {}", e))
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn get(&self, kind: EntryKind, name: &str) -> Result<Option<Entry>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.get(&kind).and_then(|m| m.get(name)).cloned())
    }

    async fn put(&self, kind: EntryKind, name: &str, meta: EntryMeta, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.entry(kind).or_default().insert(
            name.to_owned(),
            Entry {
                meta,
                data: Bytes::copy_from_slice(data),
            },
        );
        Ok(())
    }

    async fn delete(&self, kind: EntryKind, name: &str) -> Result<bool> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        Ok(inner
            .get_mut(&kind)
            .map(|m| m.remove(name).is_some())
            .unwrap_or(false))
    }

    async fn list(&self, kind: EntryKind) -> Result<BTreeMap<String, EntryMeta>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .get(&kind)
            .map(|m| m.iter().map(|(k, e)| (k.clone(), e.meta)).collect())
            .unwrap_or_default())
    }
}
