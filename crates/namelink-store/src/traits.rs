//! Store traits: the content store and the pointer store.
//!
//! Chunks live in a content-addressed [`ContentStore`], keyed by their own
//! CID and never modified. Each `(owner, namespace)` has one mutable
//! [`NameIndex`] record and each owner one [`Profile`], both kept in a
//! [`PointerStore`] that only changes them through compare-and-swap.

use async_trait::async_trait;
use bytes::Bytes;
use namelink_core::{Address, Chunk, Cid, NameIndex, Profile};

use crate::error::{Result, StoreError};

/// Outcome of a compare-and-swap on a pointer record.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapResult<T> {
    /// The record held the expected value and now holds the new one.
    Swapped,
    /// Someone else got there first. `current` is what the record holds now.
    Conflict { current: Option<T> },
}

impl<T> SwapResult<T> {
    pub fn is_swapped(&self) -> bool {
        matches!(self, SwapResult::Swapped)
    }
}

/// A pointer record together with its revision counter.
///
/// The first stored revision is 1. Every successful swap increments it.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: u64,
}

/// Content-addressed blob storage.
///
/// Same bytes always yield the same CID. `put` is idempotent.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store bytes and return their CID.
    async fn put(&self, bytes: Bytes) -> Result<Cid>;

    /// Fetch bytes by CID. Fails with [`StoreError::NotFound`] if absent.
    async fn get(&self, cid: &Cid) -> Result<Bytes>;

    /// Check whether a CID is present.
    async fn has(&self, cid: &Cid) -> Result<bool>;
}

/// Mutable pointer records with conditional update.
#[async_trait]
pub trait PointerStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Namespace Index
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the index of a namespace. `None` means no chain yet.
    async fn load_index(&self, owner: &Address, namespace: &str) -> Result<Option<NameIndex>>;

    /// Replace the index iff its current head equals `expected_head`.
    ///
    /// `expected_head = None` succeeds only if the namespace has no index.
    async fn swap_index(
        &self,
        owner: &Address,
        namespace: &str,
        expected_head: Option<&Cid>,
        next: &NameIndex,
    ) -> Result<SwapResult<NameIndex>>;

    /// Namespaces of an owner that have an index, normalized and sorted.
    async fn list_namespaces(&self, owner: &Address) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Profile
    // ─────────────────────────────────────────────────────────────────────────

    /// Load an owner's profile with its revision.
    async fn load_profile(&self, owner: &Address) -> Result<Option<Versioned<Profile>>>;

    /// Replace the profile iff its revision equals `expected_revision`.
    ///
    /// `expected_revision = None` succeeds only if no profile exists.
    async fn swap_profile(
        &self,
        owner: &Address,
        expected_revision: Option<u64>,
        next: &Profile,
    ) -> Result<SwapResult<Versioned<Profile>>>;
}

/// Everything a publisher or reader needs from a backend.
pub trait Store: ContentStore + PointerStore {}

impl<T: ContentStore + PointerStore + ?Sized> Store for T {}

/// Typed chunk access on top of a content store.
pub trait StoreExt: ContentStore {
    /// Encode and store a chunk, returning its CID.
    fn put_chunk(&self, chunk: &Chunk) -> impl std::future::Future<Output = Result<Cid>> + Send;

    /// Fetch and decode a chunk, checking the bytes hash to `cid`.
    fn get_chunk(&self, cid: &Cid) -> impl std::future::Future<Output = Result<Chunk>> + Send;
}

impl<S: ContentStore + ?Sized> StoreExt for S {
    async fn put_chunk(&self, chunk: &Chunk) -> Result<Cid> {
        let bytes = Bytes::from(chunk.to_bytes());
        self.put(bytes).await
    }

    async fn get_chunk(&self, cid: &Cid) -> Result<Chunk> {
        let bytes = self.get(cid).await?;
        if !cid.matches(&bytes) {
            return Err(StoreError::Integrity(format!(
                "bytes stored under {} hash to {}",
                cid,
                Cid::for_bytes(&bytes)
            )));
        }
        Ok(Chunk::from_bytes(&bytes)?)
    }
}
