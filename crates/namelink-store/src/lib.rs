//! # Namelink Store
//!
//! Storage abstraction for namelink: a content-addressed blob store for
//! chunks and a pointer store for the mutable index and profile records.
//!
//! ## Key Types
//!
//! - [`ContentStore`] - `put` / `get` / `has` by CID
//! - [`PointerStore`] - Name indexes and profiles, updated by compare-and-swap
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`SwapResult`] - Outcome of a compare-and-swap
//!
//! ## Usage
//!
//! ```rust,no_run
//! use namelink_store::{PointerStore, SqliteStore, SwapResult};
//! use namelink_core::{Address, Cid, NameIndex};
//!
//! async fn example() {
//!     let store = SqliteStore::open("namelink.db").unwrap();
//!     let owner = Address::from_bytes([0; 20]);
//!     let next = NameIndex::new(Cid::for_bytes(b"chunk"));
//!
//!     match store.swap_index(&owner, "media", None, &next).await.unwrap() {
//!         SwapResult::Swapped => {}
//!         SwapResult::Conflict { current } => { /* re-read and retry */ }
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent puts**: Storing the same bytes twice yields the same CID
//! - **Conditional updates**: A pointer record changes only if it still holds
//!   the value the writer last observed
//! - **Integrity on read**: [`StoreExt::get_chunk`] rejects bytes that do not
//!   hash to the requested CID

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ContentStore, PointerStore, Store, StoreExt, SwapResult, Versioned};
