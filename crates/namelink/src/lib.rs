//! # Namelink
//!
//! Signed name links in append-only, content-addressed namespaces.
//!
//! ## Overview
//!
//! An owner publishes **links**: a human-readable name bound to a payload CID,
//! signed with a secp256k1 key. Links are grouped into **namespaces**, each an
//! append-only chain of chunks in a content store. A mutable **index** maps
//! every name to the chunk holding its latest version, and the owner's
//! **profile** records namespace heads and the signing keys that readers
//! should trust.
//!
//! ## Key Concepts
//!
//! - **Link**: Immutable. A new version of a name is a new link.
//! - **Chunk**: Content-addressed. Points back at its predecessor.
//! - **Index**: Updated only by compare-and-swap on the namespace head.
//! - **Signer**: An EOA (recovered from the signature) or a contract wallet
//!   (asked via `isValidSignature`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use namelink::{LinkDraft, Publisher, PublisherConfig, Reader};
//! use namelink::core::Keypair;
//! use namelink::store::SqliteStore;
//! use namelink::verify::MemoryChain;
//!
//! async fn example() -> namelink::Result<()> {
//!     let store = Arc::new(SqliteStore::open("namelink.db")?);
//!     let publisher = Publisher::new(Keypair::generate(), store.clone(), PublisherConfig::default());
//!
//!     publisher.register_signing_key(0, None).await?;
//!     publisher.publish("media", LinkDraft::new("avatar", "Qm123")).await?;
//!
//!     let reader = Reader::new(store, MemoryChain::new(1));
//!     let link = reader.resolve(&publisher.owner(), "media", "AVATAR").await?;
//!     assert!(link.is_some());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `namelink::core` - Links, chunks, profiles, canonical encoding and keys
//! - `namelink::store` - Content and pointer stores (memory and SQLite)
//! - `namelink::verify` - EOA and contract-wallet signature verification

pub mod config;
pub mod error;
pub mod publisher;
pub mod reader;

// Re-export component crates
pub use namelink_core as core;
pub use namelink_store as store;
pub use namelink_verify as verify;

// Re-export main types for convenience
pub use config::{NamelinkConfig, PublisherConfig, ReaderConfig, VerifierConfig};
pub use error::{NamelinkError, Result};
pub use publisher::{AppendReceipt, Publisher};
pub use reader::{Reader, VerifiedLink};

// Re-export commonly used core types
pub use namelink_core::{
    Address, Chunk, Cid, Keypair, KeyStatus, Link, LinkBody, LinkDraft, NameIndex, Profile,
    SigningKey,
};
