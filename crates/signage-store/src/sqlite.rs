//! SQLite implementation of the EntryStore trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! tokio::spawn_blocking. Entry metadata is stored as CBOR.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use signage_core::clock::{Clock, SystemClock};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Entry, EntryKind, EntryMeta, EntryStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on a blocking thread.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

fn encode_meta(meta: &EntryMeta) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(meta, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_meta(bytes: &[u8]) -> Result<EntryMeta> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn get(&self, kind: EntryKind, name: &str) -> Result<Option<Entry>> {
        let name = name.to_owned();
        self.run(move |conn| {
            let row: Option<(Vec<u8>, Vec<u8>)> = conn
                .query_row(
                    "SELECT meta, data FROM entries WHERE kind = ?1 AND name = ?2",
                    params![kind.as_str(), name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            row.map(|(meta, data)| {
                Ok(Entry {
                    meta: decode_meta(&meta)?,
                    data: Bytes::from(data),
                })
            })
            .transpose()
        })
        .await
    }

    async fn put(&self, kind: EntryKind, name: &str, meta: EntryMeta, data: &[u8]) -> Result<()> {
        let name = name.to_owned();
        let data = data.to_vec();
        let meta = encode_meta(&meta)?;
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO entries (kind, name, meta, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(kind, name) DO UPDATE SET
                    meta = excluded.meta,
                    data = excluded.data,
                    updated_at = excluded.updated_at",
                params![kind.as_str(), name, meta, data, SystemClock.now_millis()],
            )?;
            tracing::debug!(%kind, %name, bytes = data.len(), "stored entry");
            Ok(())
        })
        .await
    }

    async fn delete(&self, kind: EntryKind, name: &str) -> Result<bool> {
        let name = name.to_owned();
        self.run(move |conn| {
            let n = conn.execute(
                "DELETE FROM entries WHERE kind = ?1 AND name = ?2",
                params![kind.as_str(), name],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn list(&self, kind: EntryKind) -> Result<BTreeMap<String, EntryMeta>> {
        self.run(move |conn| {
            let mut stmt =
                conn.prepare("SELECT name, meta FROM entries WHERE kind = ?1 ORDER BY name")?;
            let rows = stmt.query_map(params![kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;

            let mut out = BTreeMap::new();
            for row in rows {
                let (name, meta) = row?;
                out.insert(name, decode_meta(&meta)?);
            }
            Ok(out)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = SqliteStore::open_memory().unwrap();
        let meta = EntryMeta { encrypted: true };
        store
            .put(EntryKind::Author, "Bob (bob@example.org)", meta, b"author-bytes")
            .await
            .unwrap();

        let entry = store
            .get(EntryKind::Author, "Bob (bob@example.org)")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.meta, meta);
        assert_eq!(entry.data.as_ref(), b"author-bytes");
        assert!(store.get(EntryKind::Identity, "Bob (bob@example.org)").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_and_list() {
        let store = SqliteStore::open_memory().unwrap();
        store.put(EntryKind::Proposal, "q3", EntryMeta::default(), b"v1").await.unwrap();
        store
            .put(EntryKind::Proposal, "q3", EntryMeta { encrypted: true }, b"v2")
            .await
            .unwrap();
        store.put(EntryKind::Proposal, "budget", EntryMeta::default(), b"x").await.unwrap();

        let listed = store.list(EntryKind::Proposal).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed["q3"].encrypted);
        assert!(!listed["budget"].encrypted);

        let entry = store.get(EntryKind::Proposal, "q3").await.unwrap().unwrap();
        assert_eq!(entry.data.as_ref(), b"v2");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::open_memory().unwrap();
        store.put(EntryKind::Identity, "me", EntryMeta::default(), b"k").await.unwrap();
        assert!(store.delete(EntryKind::Identity, "me").await.unwrap());
        assert!(!store.delete(EntryKind::Identity, "me").await.unwrap());
        assert!(!store.contains(EntryKind::Identity, "me").await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signage.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .put(EntryKind::Proposal, "roadmap", EntryMeta { encrypted: true }, &[1, 2, 3])
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let entry = store.get(EntryKind::Proposal, "roadmap").await.unwrap().unwrap();
        assert_eq!(entry.data.as_ref(), &[1, 2, 3]);
        assert!(entry.meta.encrypted);
    }
}
