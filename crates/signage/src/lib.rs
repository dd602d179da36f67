//! # Signage
//!
//! Offline, signed and encrypted proposal documents.
//!
//! ## Overview
//!
//! A group of authors collaboratively appends addenda to a proposal and casts
//! unanimous-consent votes on them. The result is a hash-linked, signed and
//! encrypted file any holder can re-verify without a server:
//!
//! - **Frames**: addenda and votes, each naming its predecessor by hash
//! - **Authors**: self-attested public records with a vote count
//! - **Patches**: the frames one author added, exchanged and merged offline
//! - **Vault**: password-protected persistence of identities and files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use signage::{FileProcessor, ProcessorConfig};
//! use signage::core::Identity;
//!
//! fn example() -> signage::Result<()> {
//!     let alice = Identity::create("Alice", "alice@example.org", None);
//!     let bob = Identity::create("Bob", "bob@example.org", None);
//!
//!     let mut processor = FileProcessor::new(alice.clone(), ProcessorConfig::default());
//!     processor.create_file(vec![alice.to_author()?, bob.to_author()?])?;
//!     processor.add_addendum("Budget", "text/plain", &b"2000 EUR"[..])?;
//!
//!     let file = processor.save_file()?;
//!     # let _ = file;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `signage::core` - Cursor, keys, identities, frames and chain rules
//! - `signage::crypt` - Secret-box, sealed-box and password KDF
//! - `signage::store` - Named-entry storage and SQLite

pub mod config;
pub mod error;
pub mod format;
pub mod processor;
pub mod vault;

// Re-export component crates
pub use signage_core as core;
pub use signage_crypt as crypt;
pub use signage_store as store;

pub use config::{ProcessorConfig, VaultConfig};
pub use error::{Result, SignageError};
pub use processor::{FileProcessor, IssueHandler};
pub use vault::Vault;

// Re-export commonly used core types
pub use signage_core::{Author, Frame, FrameBody, FrameHash, Identity, Issue, Proposal};
