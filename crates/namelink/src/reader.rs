//! The Reader: resolves, enumerates and verifies published links.
//!
//! Reads start from either the pointer store's [`NameIndex`], which jumps
//! straight to the chunk holding a name, or from a [`Profile`], which only
//! knows the namespace head and is resolved by walking the chain.

use std::collections::HashSet;
use std::sync::Arc;

use namelink_core::{Address, Chunk, Cid, Link, NameIndex, Profile};
use namelink_store::{Store, StoreExt};
use namelink_verify::{ChainClient, ProfileVerification, SignatureVerifier};
use tracing::{debug, warn};

use crate::config::ReaderConfig;
use crate::error::{NamelinkError, Result};

/// A link together with its verification result.
#[derive(Debug, Clone)]
pub struct VerifiedLink {
    pub link: Link,
    pub verification: ProfileVerification,
}

/// Reads namespaces from a store and verifies links against a chain.
pub struct Reader<S: Store, C: ChainClient> {
    store: Arc<S>,
    verifier: SignatureVerifier<C>,
    config: ReaderConfig,
}

impl<S: Store, C: ChainClient> Reader<S, C> {
    pub fn new(store: Arc<S>, chain: C) -> Self {
        Self::with_config(store, chain, ReaderConfig::default())
    }

    pub fn with_config(store: Arc<S>, chain: C, config: ReaderConfig) -> Self {
        Self {
            store,
            verifier: SignatureVerifier::with_config(chain, config.verifier.clone()),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn verifier(&self) -> &SignatureVerifier<C> {
        &self.verifier
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// An owner's profile, if one was ever published.
    pub async fn profile(&self, owner: &Address) -> Result<Option<Profile>> {
        Ok(self.store.load_profile(owner).await?.map(|v| v.value))
    }

    /// The index of one namespace.
    pub async fn index(&self, owner: &Address, namespace: &str) -> Result<NameIndex> {
        self.store
            .load_index(owner, namespace)
            .await?
            .ok_or_else(|| NamelinkError::NamespaceNotFound(namespace.to_string()))
    }

    /// All namespaces of an owner.
    pub async fn namespaces(&self, owner: &Address) -> Result<Vec<String>> {
        Ok(self.store.list_namespaces(owner).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// The latest link named `name` (case-insensitive) in a namespace.
    ///
    /// Uses the index entry to go straight to the owning chunk.
    pub async fn resolve(&self, owner: &Address, namespace: &str, name: &str) -> Result<Option<Link>> {
        let index = self.index(owner, namespace).await?;
        let Some(chunk_cid) = index.lookup(name) else {
            return Ok(None);
        };

        let chunk = self.store.get_chunk(chunk_cid).await?;
        match chunk.latest(name) {
            Some(link) => Ok(Some(link.clone())),
            None => Err(NamelinkError::CorruptChain(format!(
                "index entry for {} points at chunk {} which does not hold it",
                name, chunk_cid
            ))),
        }
    }

    /// The latest link named `name`, starting from the head a profile
    /// records for `namespace` and walking towards the tail.
    pub async fn resolve_in_profile(
        &self,
        profile: &Profile,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Link>> {
        let head = profile
            .namespace_head(namespace)
            .ok_or_else(|| NamelinkError::NamespaceNotFound(namespace.to_string()))?;

        let mut walk = ChainWalk::new(*head, self.config.max_chain_walk);
        while let Some((_, chunk)) = walk.next(self.store.as_ref()).await? {
            if let Some(link) = chunk.latest(name) {
                return Ok(Some(link.clone()));
            }
        }
        Ok(None)
    }

    /// Every link in a namespace, newest first.
    pub async fn links(&self, owner: &Address, namespace: &str) -> Result<Vec<Link>> {
        let index = self.index(owner, namespace).await?;
        self.links_from(&index.head).await
    }

    /// Every link reachable from `head`, newest first.
    pub async fn links_from(&self, head: &Cid) -> Result<Vec<Link>> {
        let mut links = Vec::new();
        let mut walk = ChainWalk::new(*head, self.config.max_chain_walk);
        while let Some((_, chunk)) = walk.next(self.store.as_ref()).await? {
            links.extend(chunk.links.into_iter().rev());
        }
        debug!(%head, chunks = walk.visited(), links = links.len(), "walked chain");
        Ok(links)
    }

    /// Every version of `name` in a namespace, newest first.
    pub async fn history(&self, owner: &Address, namespace: &str, name: &str) -> Result<Vec<Link>> {
        let links = self.links(owner, namespace).await?;
        Ok(links.into_iter().filter(|link| link.has_name(name)).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify a link's signature and its signer's key in `profile`.
    pub async fn verify_link(&self, profile: &Profile, link: &Link) -> Result<ProfileVerification> {
        Ok(self.verifier.verify_for_profile(profile, link).await?)
    }

    /// Verify every link in a namespace against the owner's profile.
    ///
    /// A missing profile counts as one with no registered keys.
    pub async fn verify_namespace(
        &self,
        owner: &Address,
        namespace: &str,
    ) -> Result<Vec<VerifiedLink>> {
        let profile = self.profile(owner).await?.unwrap_or_default();
        let links = self.links(owner, namespace).await?;

        let mut verified = Vec::with_capacity(links.len());
        for link in links {
            let verification = self.verify_link(&profile, &link).await?;
            if !verification.is_trusted() {
                warn!(
                    %owner,
                    %namespace,
                    name = %link.name(),
                    outcome = ?verification.report.outcome,
                    key_status = ?verification.key_status,
                    "untrusted link"
                );
            }
            verified.push(VerifiedLink { link, verification });
        }
        Ok(verified)
    }
}

/// Follows `prev` pointers from a head, guarding against cycles and
/// runaway chains.
struct ChainWalk {
    next: Option<Cid>,
    seen: HashSet<Cid>,
    limit: usize,
}

impl ChainWalk {
    fn new(head: Cid, limit: usize) -> Self {
        Self {
            next: Some(head),
            seen: HashSet::new(),
            limit,
        }
    }

    fn visited(&self) -> usize {
        self.seen.len()
    }

    async fn next<S: Store + ?Sized>(&mut self, store: &S) -> Result<Option<(Cid, Chunk)>> {
        let Some(cid) = self.next.take() else {
            return Ok(None);
        };
        if !self.seen.insert(cid) {
            return Err(NamelinkError::CorruptChain(format!("cycle at chunk {}", cid)));
        }
        if self.seen.len() > self.limit {
            return Err(NamelinkError::CorruptChain(format!(
                "chain longer than {} chunks",
                self.limit
            )));
        }

        let chunk = store.get_chunk(&cid).await?;
        self.next = chunk.prev;
        Ok(Some((cid, chunk)))
    }
}
