//! LinkSigner: turns a draft into a signed, replay-protected link.

use crate::crypto::{Address, Keypair};
use crate::error::{CoreError, Result};
use crate::link::{Link, LinkBody, LinkDraft};
use crate::types::{now_secs, Nonce};

/// Supplies private key material to the signer.
///
/// How keys are stored is up to the implementor.
pub trait KeyProvider {
    /// The keypair to sign with, if one is available.
    fn keypair(&self) -> Option<&Keypair>;
}

impl KeyProvider for Keypair {
    fn keypair(&self) -> Option<&Keypair> {
        Some(self)
    }
}

impl KeyProvider for Option<Keypair> {
    fn keypair(&self) -> Option<&Keypair> {
        self.as_ref()
    }
}

/// Signs link drafts for one chain.
#[derive(Debug, Clone, Copy)]
pub struct LinkSigner {
    chain_id: u64,
}

impl LinkSigner {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign with the current time and a fresh random nonce.
    ///
    /// `signerAddress` is the address of the provided key.
    pub fn sign<K: KeyProvider + ?Sized>(&self, draft: LinkDraft, keys: &K) -> Result<Link> {
        self.sign_at(draft, keys, now_secs(), Nonce::random())
    }

    /// Sign with an explicit timestamp and nonce.
    pub fn sign_at<K: KeyProvider + ?Sized>(
        &self,
        draft: LinkDraft,
        keys: &K,
        signed_at: u64,
        nonce: Nonce,
    ) -> Result<Link> {
        let keypair = keys.keypair().ok_or(CoreError::SigningKeyUnavailable)?;
        let body = draft.into_body(self.chain_id, keypair.address(), signed_at, nonce)?;
        sign_body(body, keypair)
    }

    /// Sign on behalf of a contract wallet.
    ///
    /// The signature is produced by the wallet's owner key but
    /// `signerAddress` names the wallet, so verification goes through the
    /// wallet contract.
    pub fn sign_for_wallet<K: KeyProvider + ?Sized>(
        &self,
        draft: LinkDraft,
        keys: &K,
        wallet: Address,
    ) -> Result<Link> {
        self.sign_for_wallet_at(draft, keys, wallet, now_secs(), Nonce::random())
    }

    /// [`LinkSigner::sign_for_wallet`] with an explicit timestamp and nonce.
    pub fn sign_for_wallet_at<K: KeyProvider + ?Sized>(
        &self,
        draft: LinkDraft,
        keys: &K,
        wallet: Address,
        signed_at: u64,
        nonce: Nonce,
    ) -> Result<Link> {
        let keypair = keys.keypair().ok_or(CoreError::SigningKeyUnavailable)?;
        let body = draft.into_body(self.chain_id, wallet, signed_at, nonce)?;
        sign_body(body, keypair)
    }
}

/// Sign a fully populated body as-is.
pub fn sign_body(body: LinkBody, keypair: &Keypair) -> Result<Link> {
    body.validate()?;
    let signature = keypair.sign_digest(&body.signing_digest())?;
    Ok(Link { body, signature })
}
