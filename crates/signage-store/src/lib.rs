//! # Signage Store
//!
//! Storage abstraction for Signage. Persists identities, authors and proposal
//! files as named entries behind the [`EntryStore`] trait.
//!
//! ## Key Types
//!
//! - [`EntryStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`EntryMeta`] - Per-entry metadata (currently just the encryption flag)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use signage_store::{EntryKind, EntryMeta, EntryStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("signage.db").unwrap();
//!     store
//!         .put(EntryKind::Proposal, "roadmap", EntryMeta::default(), b"...")
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Entry, EntryKind, EntryMeta, EntryStore};
