//! # Signage Testkit
//!
//! Testing utilities for Signage.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Deterministic identities for multi-party scenarios
//! - **Clocks**: A [`TickingClock`] that never stands still
//! - **Issue capture**: An [`IssueLog`] to plug in as an issue handler
//! - **Generators**: Proptest strategies for identities and addenda
//!
//! ## Test Fixtures
//!
//! ```rust
//! use signage_testkit::{multi_party_fixtures, TickingClock};
//! use signage_core::Clock;
//!
//! let parties = multi_party_fixtures(3);
//! let authors: Vec<_> = parties.iter().map(|p| p.author()).collect();
//! assert_eq!(authors.len(), 3);
//!
//! let clock = TickingClock::default();
//! assert!(clock.now_millis() < clock.now_millis());
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_party_fixtures, IssueLog, TestFixture, TickingClock, FAST_KDF};
pub use generators::{addendum_from_params, AddendumParams};
