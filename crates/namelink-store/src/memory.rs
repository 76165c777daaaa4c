//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use namelink_core::{normalize_key, Address, Cid, NameIndex, Profile};

use crate::error::{Result, StoreError};
use crate::traits::{ContentStore, PointerStore, SwapResult, Versioned};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Blobs indexed by CID.
    blobs: HashMap<Cid, Bytes>,

    /// (owner, normalized namespace) -> index.
    indexes: HashMap<(Address, String), NameIndex>,

    /// owner -> profile.
    profiles: HashMap<Address, Versioned<Profile>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored blobs.
    pub fn blob_count(&self) -> Result<usize> {
        Ok(self.read()?.blobs.len())
    }

    /// Overwrite the bytes stored under a CID without rehashing.
    ///
    /// Only useful for simulating a corrupted or hostile content store.
    pub fn insert_raw(&self, cid: Cid, bytes: Bytes) -> Result<()> {
        self.write()?.blobs.insert(cid, bytes);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        let cid = Cid::for_bytes(&bytes);
        self.write()?.blobs.entry(cid).or_insert(bytes);
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        self.read()?
            .blobs
            .get(cid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(cid.to_string()))
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        Ok(self.read()?.blobs.contains_key(cid))
    }
}

#[async_trait]
impl PointerStore for MemoryStore {
    async fn load_index(&self, owner: &Address, namespace: &str) -> Result<Option<NameIndex>> {
        let key = (*owner, normalize_key(namespace));
        Ok(self.read()?.indexes.get(&key).cloned())
    }

    async fn swap_index(
        &self,
        owner: &Address,
        namespace: &str,
        expected_head: Option<&Cid>,
        next: &NameIndex,
    ) -> Result<SwapResult<NameIndex>> {
        let key = (*owner, normalize_key(namespace));
        let mut inner = self.write()?;

        let current = inner.indexes.get(&key);
        if current.map(|index| &index.head) != expected_head {
            return Ok(SwapResult::Conflict {
                current: current.cloned(),
            });
        }

        inner.indexes.insert(key, next.clone());
        Ok(SwapResult::Swapped)
    }

    async fn list_namespaces(&self, owner: &Address) -> Result<Vec<String>> {
        let inner = self.read()?;
        let mut namespaces: Vec<String> = inner
            .indexes
            .keys()
            .filter(|(o, _)| o == owner)
            .map(|(_, ns)| ns.clone())
            .collect();
        namespaces.sort();
        Ok(namespaces)
    }

    async fn load_profile(&self, owner: &Address) -> Result<Option<Versioned<Profile>>> {
        Ok(self.read()?.profiles.get(owner).cloned())
    }

    async fn swap_profile(
        &self,
        owner: &Address,
        expected_revision: Option<u64>,
        next: &Profile,
    ) -> Result<SwapResult<Versioned<Profile>>> {
        let mut inner = self.write()?;

        let current = inner.profiles.get(owner);
        if current.map(|p| p.revision) != expected_revision {
            return Ok(SwapResult::Conflict {
                current: current.cloned(),
            });
        }

        let revision = expected_revision.map_or(1, |r| r + 1);
        inner.profiles.insert(
            *owner,
            Versioned {
                value: next.clone(),
                revision,
            },
        );
        Ok(SwapResult::Swapped)
    }
}
