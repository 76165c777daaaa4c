//! # Namelink Testkit
//!
//! Testing utilities for namelink.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed inputs with pinned derived outputs
//! - **Generators**: Proptest strategies for drafts and signed links
//! - **Fixtures**: A keypair, store and chain wired together
//! - **Failure injection**: [`FlakyStore`] for outages and lost races
//!
//! ## Golden Vectors
//!
//! ```rust
//! use namelink_testkit::vectors::{all_vectors, link_from_vector};
//!
//! for vector in all_vectors() {
//!     let link = link_from_vector(&vector);
//!     println!("{}: {}", vector.name, link.signature.to_hex());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use namelink_testkit::generators::{link_from_params, LinkParams};
//!
//! proptest! {
//!     #[test]
//!     fn signing_is_deterministic(params: LinkParams) {
//!         let l1 = link_from_params(&params);
//!         let l2 = link_from_params(&params);
//!         prop_assert_eq!(l1.signature, l2.signature);
//!     }
//! }
//! ```
//!
//! ## Failure Injection
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use namelink_store::MemoryStore;
//! use namelink_testkit::FlakyStore;
//!
//! let store = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
//! store.inject_rivals(2); // the next two appends lose their first race
//! ```

pub mod fixtures;
pub mod flaky;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture, TEST_CHAIN_ID};
pub use flaky::FlakyStore;
pub use generators::{link_from_params, LinkParams};
pub use vectors::{all_vectors, link_from_vector, verify_all_vectors, GoldenVector};
