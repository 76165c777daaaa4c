//! Failure injection around a real store.
//!
//! [`FlakyStore`] forwards to an inner store but can be told to go offline,
//! to fail a number of upcoming `put`s or profile swaps, or to let a rival
//! writer win the race for a namespace head right before the caller's
//! compare-and-swap.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use namelink_core::{Address, Chunk, Cid, Keypair, LinkDraft, LinkSigner, NameIndex, Profile};
use namelink_store::{
    ContentStore, PointerStore, Result, StoreError, StoreExt, SwapResult, Versioned,
};
use tracing::debug;

/// A store wrapper that fails on demand.
pub struct FlakyStore<S> {
    inner: Arc<S>,
    offline: AtomicBool,
    failing_puts: AtomicUsize,
    failing_profile_swaps: AtomicUsize,
    pending_rivals: AtomicUsize,
    rivals_landed: AtomicUsize,
    index_swaps: AtomicUsize,
    rival: Keypair,
    rival_signer: LinkSigner,
}

impl<S: ContentStore + PointerStore> FlakyStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            failing_puts: AtomicUsize::new(0),
            failing_profile_swaps: AtomicUsize::new(0),
            pending_rivals: AtomicUsize::new(0),
            rivals_landed: AtomicUsize::new(0),
            index_swaps: AtomicUsize::new(0),
            rival: Keypair::generate(),
            rival_signer: LinkSigner::new(1),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `put`.
    pub fn fail_next_puts(&self, n: usize) {
        self.failing_puts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `swap_profile`.
    pub fn fail_next_profile_swaps(&self, n: usize) {
        self.failing_profile_swaps.store(n, Ordering::SeqCst);
    }

    /// Let a rival append land before each of the next `n` index swaps.
    pub fn inject_rivals(&self, n: usize) {
        self.pending_rivals.store(n, Ordering::SeqCst);
    }

    /// Rival appends that have landed so far.
    pub fn rivals_landed(&self) -> usize {
        self.rivals_landed.load(Ordering::SeqCst)
    }

    /// Index swaps attempted by callers (rival swaps excluded).
    pub fn index_swaps(&self) -> usize {
        self.index_swaps.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn land_rival(&self, owner: &Address, namespace: &str) -> Result<()> {
        let current = self.inner.load_index(owner, namespace).await?;
        let n = self.rivals_landed.load(Ordering::SeqCst);
        let link = self.rival_signer.sign(
            LinkDraft::new(format!("rival-{}", n), "QmRival"),
            &self.rival,
        )?;

        let chunk = Chunk::single(current.as_ref().map(|index| index.head), link);
        let cid = self.inner.put_chunk(&chunk).await?;
        let next = NameIndex::advance(current.as_ref(), cid, &chunk);
        let expected = current.as_ref().map(|index| index.head);

        if self
            .inner
            .swap_index(owner, namespace, expected.as_ref(), &next)
            .await?
            .is_swapped()
        {
            self.rivals_landed.fetch_add(1, Ordering::SeqCst);
            debug!(%namespace, head = %cid, "rival append landed");
        }
        Ok(())
    }
}

#[async_trait]
impl<S: ContentStore + PointerStore> ContentStore for FlakyStore<S> {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        self.check_online()?;
        if Self::take(&self.failing_puts) {
            return Err(StoreError::Unavailable("injected put failure".into()));
        }
        self.inner.put(bytes).await
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        self.check_online()?;
        self.inner.get(cid).await
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        self.check_online()?;
        self.inner.has(cid).await
    }
}

#[async_trait]
impl<S: ContentStore + PointerStore> PointerStore for FlakyStore<S> {
    async fn load_index(&self, owner: &Address, namespace: &str) -> Result<Option<NameIndex>> {
        self.check_online()?;
        self.inner.load_index(owner, namespace).await
    }

    async fn swap_index(
        &self,
        owner: &Address,
        namespace: &str,
        expected_head: Option<&Cid>,
        next: &NameIndex,
    ) -> Result<SwapResult<NameIndex>> {
        self.check_online()?;
        self.index_swaps.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.pending_rivals) {
            self.land_rival(owner, namespace).await?;
        }
        self.inner
            .swap_index(owner, namespace, expected_head, next)
            .await
    }

    async fn list_namespaces(&self, owner: &Address) -> Result<Vec<String>> {
        self.check_online()?;
        self.inner.list_namespaces(owner).await
    }

    async fn load_profile(&self, owner: &Address) -> Result<Option<Versioned<Profile>>> {
        self.check_online()?;
        self.inner.load_profile(owner).await
    }

    async fn swap_profile(
        &self,
        owner: &Address,
        expected_revision: Option<u64>,
        next: &Profile,
    ) -> Result<SwapResult<Versioned<Profile>>> {
        self.check_online()?;
        if Self::take(&self.failing_profile_swaps) {
            return Err(StoreError::Unavailable("injected profile swap failure".into()));
        }
        self.inner
            .swap_profile(owner, expected_revision, next)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namelink_store::MemoryStore;

    #[tokio::test]
    async fn test_offline_store() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        store.set_offline(true);

        let err = store.put(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(err.is_transient());

        store.set_offline(false);
        assert!(store.put(Bytes::from_static(b"x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_puts_countdown() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        store.fail_next_puts(2);

        assert!(store.put(Bytes::from_static(b"a")).await.is_err());
        assert!(store.put(Bytes::from_static(b"a")).await.is_err());
        assert!(store.put(Bytes::from_static(b"a")).await.is_ok());
    }
}
