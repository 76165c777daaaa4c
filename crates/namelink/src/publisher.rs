//! The Publisher: signs links and appends them to namespace chains.
//!
//! An append stores a new chunk whose `prev` is the current head, then
//! moves the namespace index to it with a compare-and-swap. Losing the swap
//! means someone else appended first; the links are re-chunked on top of the
//! new head and the swap is tried again, up to
//! [`PublisherConfig::max_append_attempts`] times. The chunk is always
//! written before the swap that references it, so a reader never sees a head
//! whose ancestors are missing. A chunk orphaned by a lost swap is harmless.

use std::sync::Arc;
use std::time::Duration;

use namelink_core::{
    Address, Chunk, Cid, Keypair, Link, LinkDraft, LinkSigner, NameIndex, Profile, SigningKey,
};
use namelink_store::{Store, StoreExt, SwapResult, Versioned};
use tracing::{debug, info, warn};

use crate::config::PublisherConfig;
use crate::error::{NamelinkError, Result};

/// Result of a successful append.
#[derive(Debug, Clone)]
pub struct AppendReceipt {
    /// CID of the chunk holding the appended links.
    pub chunk_cid: Cid,
    /// The namespace index as published.
    pub index: NameIndex,
    /// Number of attempts it took, starting at 1.
    pub attempts: u32,
    /// Whether the profile was pointed at the new head. When `false` the
    /// links are still published; the next append or
    /// [`Publisher::sync_profile`] repairs the profile.
    pub profile_synced: bool,
}

/// Publishes links for one identity.
pub struct Publisher<S: Store> {
    /// Key that produces signatures.
    keypair: Keypair,
    /// Identity the records are stored under; a wallet address when
    /// publishing for a contract wallet.
    owner: Address,
    /// Set when `owner` is a contract wallet.
    wallet: bool,
    signer: LinkSigner,
    store: Arc<S>,
    config: PublisherConfig,
}

impl<S: Store> Publisher<S> {
    /// Publish as the externally-owned account of `keypair`.
    pub fn new(keypair: Keypair, store: Arc<S>, config: PublisherConfig) -> Self {
        Self {
            owner: keypair.address(),
            wallet: false,
            signer: LinkSigner::new(config.chain_id),
            keypair,
            store,
            config,
        }
    }

    /// Publish as contract wallet `wallet`, signing with its owner key.
    pub fn for_wallet(
        owner_key: Keypair,
        wallet: Address,
        store: Arc<S>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            owner: wallet,
            wallet: true,
            signer: LinkSigner::new(config.chain_id),
            keypair: owner_key,
            store,
            config,
        }
    }

    /// The identity records are published under.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Links
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign a draft as this publisher's identity.
    pub fn sign(&self, draft: LinkDraft) -> Result<Link> {
        let link = if self.wallet {
            self.signer.sign_for_wallet(draft, &self.keypair, self.owner)?
        } else {
            self.signer.sign(draft, &self.keypair)?
        };
        Ok(link)
    }

    /// Sign a draft and append it to `namespace`.
    pub async fn publish(&self, namespace: &str, draft: LinkDraft) -> Result<(Link, AppendReceipt)> {
        let link = self.sign(draft)?;
        let receipt = self.append(namespace, link.clone()).await?;
        Ok((link, receipt))
    }

    /// Append one link to `namespace` in its own chunk.
    pub async fn append(&self, namespace: &str, link: Link) -> Result<AppendReceipt> {
        self.append_many(namespace, vec![link]).await
    }

    /// Append several links to `namespace` in a single chunk.
    ///
    /// If the batch holds the same name more than once, the later position
    /// is the one that resolves.
    ///
    /// Once the index swap lands the append is committed and this returns
    /// `Ok`, even if updating the profile afterwards fails.
    pub async fn append_many(&self, namespace: &str, links: Vec<Link>) -> Result<AppendReceipt> {
        if links.is_empty() {
            return Err(NamelinkError::InvalidOperation(
                "cannot append an empty batch".into(),
            ));
        }
        for link in &links {
            link.body.validate()?;
        }

        let mut observed = self.store.load_index(&self.owner, namespace).await?;

        for attempt in 1..=self.config.max_append_attempts {
            let expected_head = observed.as_ref().map(|index| index.head);
            let chunk = Chunk {
                prev: expected_head,
                links: links.clone(),
            };

            let chunk_cid = self.store.put_chunk(&chunk).await?;
            debug!(%namespace, %chunk_cid, attempt, "stored chunk");

            let next = NameIndex::advance(observed.as_ref(), chunk_cid, &chunk);
            match self
                .store
                .swap_index(&self.owner, namespace, expected_head.as_ref(), &next)
                .await?
            {
                SwapResult::Swapped => {
                    info!(
                        owner = %self.owner,
                        %namespace,
                        head = %chunk_cid,
                        links = chunk.links.len(),
                        attempt,
                        "appended to namespace"
                    );
                    let profile_synced = match self.sync_profile(namespace).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(
                                owner = %self.owner,
                                %namespace,
                                head = %chunk_cid,
                                error = %e,
                                "append committed but profile not updated"
                            );
                            false
                        }
                    };
                    return Ok(AppendReceipt {
                        chunk_cid,
                        index: next,
                        attempts: attempt,
                        profile_synced,
                    });
                }
                SwapResult::Conflict { current } => {
                    warn!(
                        %namespace,
                        attempt,
                        current_head = ?current.as_ref().map(|index| index.head),
                        "namespace head moved, retrying append"
                    );
                    observed = current;
                    if attempt < self.config.max_append_attempts {
                        self.backoff(attempt).await;
                    }
                }
            }
        }

        Err(NamelinkError::AppendConflictExhausted {
            namespace: namespace.to_string(),
            attempts: self.config.max_append_attempts,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Profile
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply `edit` to the stored profile with compare-and-swap retry.
    ///
    /// `edit` may run several times, each time on the latest profile.
    pub async fn update_profile<F>(&self, edit: F) -> Result<Versioned<Profile>>
    where
        F: FnMut(&mut Profile) + Send,
    {
        self.edit_profile(None, edit).await
    }

    /// Register this publisher's signing identity in the profile.
    ///
    /// An EOA publisher registers its public key; a wallet publisher
    /// registers the wallet address. Returns the fingerprint.
    pub async fn register_signing_key(
        &self,
        valid_from: u64,
        valid_to: Option<u64>,
    ) -> Result<String> {
        let mut key = if self.wallet {
            SigningKey::for_wallet(&self.owner, valid_from)
        } else {
            SigningKey::new(&self.keypair.public_key(), valid_from)
        };
        key.valid_to = valid_to;
        let fingerprint = key.fingerprint()?.to_hex();

        self.update_profile(|profile| {
            profile.signing_keys.insert(fingerprint.clone(), key.clone());
        })
        .await?;
        info!(owner = %self.owner, %fingerprint, valid_from, "registered signing key");
        Ok(fingerprint)
    }

    /// Revoke a key from time `at`.
    pub async fn revoke_signing_key(&self, fingerprint: &str, at: u64) -> Result<()> {
        let mut found = false;
        self.update_profile(|profile| {
            found = profile.revoke_key(fingerprint, at);
        })
        .await?;

        if !found {
            return Err(NamelinkError::InvalidOperation(format!(
                "no signing key with fingerprint {}",
                fingerprint
            )));
        }
        info!(owner = %self.owner, %fingerprint, at, "revoked signing key");
        Ok(())
    }

    /// Point the profile at the namespace's current head.
    pub async fn sync_profile(&self, namespace: &str) -> Result<()> {
        self.edit_profile(Some(namespace), |_| {}).await?;
        Ok(())
    }

    async fn edit_profile<F>(
        &self,
        refresh_namespace: Option<&str>,
        mut edit: F,
    ) -> Result<Versioned<Profile>>
    where
        F: FnMut(&mut Profile) + Send,
    {
        for attempt in 1..=self.config.max_append_attempts {
            let (mut profile, expected_revision) =
                match self.store.load_profile(&self.owner).await? {
                    Some(current) => (current.value, Some(current.revision)),
                    None => (Profile::new(), None),
                };

            // Read the index after the profile, so a swap that wins carries
            // a head at least as new as any earlier winner's.
            if let Some(namespace) = refresh_namespace {
                if let Some(index) = self.store.load_index(&self.owner, namespace).await? {
                    profile.set_namespace_head(namespace, index.head);
                }
            }
            edit(&mut profile);

            match self
                .store
                .swap_profile(&self.owner, expected_revision, &profile)
                .await?
            {
                SwapResult::Swapped => {
                    let revision = expected_revision.map_or(1, |r| r + 1);
                    debug!(owner = %self.owner, revision, attempt, "updated profile");
                    return Ok(Versioned {
                        value: profile,
                        revision,
                    });
                }
                SwapResult::Conflict { .. } => {
                    debug!(owner = %self.owner, attempt, "profile revision moved, retrying");
                    if attempt < self.config.max_append_attempts {
                        self.backoff(attempt).await;
                    }
                }
            }
        }

        Err(NamelinkError::ProfileConflictExhausted {
            attempts: self.config.max_append_attempts,
        })
    }

    async fn backoff(&self, attempt: u32) {
        let factor = 1u64 << attempt.saturating_sub(1).min(10);
        let delay = self.config.retry_backoff_ms.saturating_mul(factor);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}
