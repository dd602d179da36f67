//! The vault: identity, author and proposal persistence on an [`EntryStore`].
//!
//! Identities and authors are stored under `"{name} ({mail})"`; proposals
//! under a caller-chosen name. When a password is given, the entry is
//! secret-boxed under an Argon2id-derived key and its metadata marks it
//! encrypted.

use std::collections::BTreeMap;
use std::sync::Arc;

use signage_core::{Author, Identity, Principal, Reader, Writer};
use signage_crypt::{derive_password_key, SymmetricKey};
use signage_store::{EntryKind, EntryMeta, EntryStore};

use crate::config::VaultConfig;
use crate::error::{Result, SignageError};

/// Password-aware persistence for identities, authors and proposal files.
pub struct Vault<S: EntryStore> {
    store: Arc<S>,
    config: VaultConfig,
}

impl<S: EntryStore> Vault<S> {
    pub fn new(store: S, config: VaultConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Entry name of an identity or author.
    pub fn entry_name(principal: &(impl Principal + ?Sized)) -> String {
        format!("{} ({})", principal.name(), principal.mail())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an identity including its secret keys. Returns the entry name.
    pub async fn save_identity(&self, identity: &Identity, password: Option<&str>) -> Result<String> {
        let mut w = Writer::new();
        identity.write_to(&mut w)?;
        let name = Self::entry_name(identity);
        self.put(EntryKind::Identity, &name, w.written(), password).await?;
        Ok(name)
    }

    pub async fn load_identity(&self, name: &str, password: Option<&str>) -> Result<Identity> {
        let data = self.get(EntryKind::Identity, name, password).await?;
        Ok(Identity::read_from(&mut Reader::new(&data))?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authors
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an author record with its current attestation. Returns the entry name.
    pub async fn save_author(&self, author: &Author, password: Option<&str>) -> Result<String> {
        let mut w = Writer::new();
        author.write_to(&mut w)?;
        let name = Self::entry_name(author);
        self.put(EntryKind::Author, &name, w.written(), password).await?;
        Ok(name)
    }

    /// Load an author record, verifying its attestation.
    pub async fn load_author(&self, name: &str, password: Option<&str>) -> Result<Author> {
        let data = self.get(EntryKind::Author, name, password).await?;
        Ok(Author::read_from(&mut Reader::new(&data))?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Proposals
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn save_proposal(&self, name: &str, file: &[u8], password: Option<&str>) -> Result<()> {
        self.put(EntryKind::Proposal, name, file, password).await
    }

    pub async fn load_proposal(&self, name: &str, password: Option<&str>) -> Result<Vec<u8>> {
        self.get(EntryKind::Proposal, name, password).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entries
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete an entry. Returns whether it existed.
    pub async fn remove(&self, kind: EntryKind, name: &str) -> Result<bool> {
        let removed = self.store.delete(kind, name).await?;
        tracing::debug!(%kind, name, removed, "removed entry");
        Ok(removed)
    }

    /// Names and metadata of all entries of `kind`.
    pub async fn available(&self, kind: EntryKind) -> Result<BTreeMap<String, EntryMeta>> {
        Ok(self.store.list(kind).await?)
    }

    async fn derive_key(&self, password: &str) -> Result<SymmetricKey> {
        let password = password.to_owned();
        let params = self.config.kdf;
        tokio::task::spawn_blocking(move || derive_password_key(password.as_bytes(), &params))
            .await
            .map_err(|e| SignageError::Task(e.to_string()))?
            .map_err(SignageError::from)
    }

    async fn put(&self, kind: EntryKind, name: &str, plain: &[u8], password: Option<&str>) -> Result<()> {
        let (meta, data) = match password {
            Some(pw) => {
                let key = self.derive_key(pw).await?;
                (EntryMeta { encrypted: true }, key.encrypt(plain)?)
            }
            None => (EntryMeta { encrypted: false }, plain.to_vec()),
        };
        self.store.put(kind, name, meta, &data).await?;
        tracing::info!(%kind, name, encrypted = meta.encrypted, "saved entry");
        Ok(())
    }

    async fn get(&self, kind: EntryKind, name: &str, password: Option<&str>) -> Result<Vec<u8>> {
        let entry = self
            .store
            .get(kind, name)
            .await?
            .ok_or_else(|| SignageError::EntryNotFound {
                kind,
                name: name.to_owned(),
            })?;

        if !entry.meta.encrypted {
            return Ok(entry.data.to_vec());
        }
        let pw = password.ok_or_else(|| SignageError::PasswordRequired {
            kind,
            name: name.to_owned(),
        })?;
        let key = self.derive_key(pw).await?;
        Ok(key.decrypt(&entry.data)?)
    }
}
