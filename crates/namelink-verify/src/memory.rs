//! In-process chain for tests and local development.
//!
//! Holds a set of contract wallets keyed by address. Calls are dispatched to
//! the wallet at the target address; anything else behaves like an EOA.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use namelink_core::{Address, RecoverableSignature};

use crate::chain::{CallOutcome, ChainClient};
use crate::eip1271;
use crate::error::ChainError;

/// A contract wallet's signature check.
pub trait ContractWallet: Send + Sync {
    /// Answer `isValidSignature(hash, signature)`.
    fn is_valid_signature(&self, hash: &[u8; 32], signature: &[u8]) -> CallOutcome;
}

/// A single-owner wallet: accepts exactly the signatures its owner key made.
#[derive(Debug, Clone)]
pub struct OwnerWallet {
    owner: Address,
}

impl OwnerWallet {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }
}

impl ContractWallet for OwnerWallet {
    fn is_valid_signature(&self, hash: &[u8; 32], signature: &[u8]) -> CallOutcome {
        let recovered = RecoverableSignature::from_slice(signature)
            .and_then(|sig| sig.recover(hash))
            .ok();

        if recovered == Some(self.owner) {
            CallOutcome::Returned(eip1271::encode_magic_return())
        } else {
            CallOutcome::Returned(vec![0u8; 32])
        }
    }
}

/// An in-memory [`ChainClient`].
pub struct MemoryChain {
    chain_id: u64,
    wallets: RwLock<HashMap<Address, Arc<dyn ContractWallet>>>,
    reverting: RwLock<HashSet<Address>>,
    reachable: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            wallets: RwLock::new(HashMap::new()),
            reverting: RwLock::new(HashSet::new()),
            reachable: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Deploy a wallet at `address`.
    pub fn deploy(&self, address: Address, wallet: impl ContractWallet + 'static) -> Result<(), ChainError> {
        self.wallets
            .write()
            .map_err(|e| ChainError::Rpc(format!("lock poisoned: {}", e)))?
            .insert(address, Arc::new(wallet));
        Ok(())
    }

    /// Make every call to `address` revert.
    pub fn force_revert(&self, address: Address) -> Result<(), ChainError> {
        self.reverting
            .write()
            .map_err(|e| ChainError::Rpc(format!("lock poisoned: {}", e)))?
            .insert(address);
        Ok(())
    }

    /// Simulate the endpoint going away (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of contract calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn ensure_reachable(&self) -> Result<(), ChainError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChainError::Unreachable("memory chain is offline".into()))
        }
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn has_code(&self, address: &Address) -> Result<bool, ChainError> {
        self.ensure_reachable()?;
        let wallets = self
            .wallets
            .read()
            .map_err(|e| ChainError::Rpc(format!("lock poisoned: {}", e)))?;
        Ok(wallets.contains_key(address))
    }

    async fn call(&self, to: &Address, data: &[u8]) -> Result<CallOutcome, ChainError> {
        self.ensure_reachable()?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reverting = self
            .reverting
            .read()
            .map_err(|e| ChainError::Rpc(format!("lock poisoned: {}", e)))?
            .contains(to);
        if reverting {
            return Ok(CallOutcome::Reverted);
        }

        let wallet = self
            .wallets
            .read()
            .map_err(|e| ChainError::Rpc(format!("lock poisoned: {}", e)))?
            .get(to)
            .cloned();

        // No code: the call succeeds with empty return data
        let Some(wallet) = wallet else {
            return Ok(CallOutcome::Returned(Vec::new()));
        };

        match eip1271::decode_call(data) {
            Some((hash, signature)) => Ok(wallet.is_valid_signature(&hash, &signature)),
            None => Ok(CallOutcome::Reverted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namelink_core::crypto::keccak256;
    use namelink_core::Keypair;

    #[tokio::test]
    async fn test_owner_wallet_accepts_owner_signature() {
        let owner = Keypair::generate();
        let wallet = Address::from_bytes([0x99; 20]);
        let chain = MemoryChain::new(1);
        chain.deploy(wallet, OwnerWallet::new(owner.address())).unwrap();

        let hash = keccak256(b"message");
        let sig = owner.sign_digest(&hash).unwrap();
        let ret = chain
            .call(&wallet, &eip1271::encode_call(&hash, sig.as_bytes()))
            .await
            .unwrap();
        assert_eq!(ret, CallOutcome::Returned(eip1271::encode_magic_return()));

        let stranger = Keypair::generate().sign_digest(&hash).unwrap();
        let ret = chain
            .call(&wallet, &eip1271::encode_call(&hash, stranger.as_bytes()))
            .await
            .unwrap();
        assert_eq!(ret, CallOutcome::Returned(vec![0u8; 32]));
        assert_eq!(chain.call_count(), 2);
    }

    #[tokio::test]
    async fn test_code_probe() {
        let chain = MemoryChain::new(1);
        let wallet = Address::from_bytes([0x01; 20]);
        chain.deploy(wallet, OwnerWallet::new(Address::from_bytes([0x02; 20]))).unwrap();

        assert!(chain.has_code(&wallet).await.unwrap());
        assert!(!chain.has_code(&Address::from_bytes([0x02; 20])).await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_and_revert() {
        let chain = MemoryChain::new(1);
        let wallet = Address::from_bytes([0x01; 20]);
        chain.deploy(wallet, OwnerWallet::new(Address::from_bytes([0x02; 20]))).unwrap();

        chain.force_revert(wallet).unwrap();
        assert_eq!(
            chain.call(&wallet, &[]).await.unwrap(),
            CallOutcome::Reverted
        );

        chain.set_reachable(false);
        assert!(matches!(
            chain.has_code(&wallet).await,
            Err(ChainError::Unreachable(_))
        ));
    }
}
