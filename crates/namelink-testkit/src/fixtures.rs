//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use namelink::{Publisher, PublisherConfig, Reader};
use namelink_core::{Address, Keypair, Link, LinkDraft, LinkSigner, Nonce};
use namelink_store::MemoryStore;
use namelink_verify::MemoryChain;

/// Chain id used by fixtures unless overridden.
pub const TEST_CHAIN_ID: u64 = 100;

/// A test fixture with a keypair, a memory store and a memory chain.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: Arc<MemoryStore>,
    pub chain: Arc<MemoryChain>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::with_keypair(Keypair::generate())
    }

    /// Create with a deterministic keypair from a secret scalar.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_keypair(Keypair::from_seed(&seed).expect("seed is a valid secret scalar"))
    }

    fn with_keypair(keypair: Keypair) -> Self {
        Self {
            keypair,
            store: Arc::new(MemoryStore::new()),
            chain: Arc::new(MemoryChain::new(TEST_CHAIN_ID)),
        }
    }

    /// The keypair's address.
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// Publisher configuration bound to the fixture chain.
    pub fn config(&self) -> PublisherConfig {
        PublisherConfig {
            chain_id: TEST_CHAIN_ID,
            ..PublisherConfig::default()
        }
    }

    /// A publisher for the fixture keypair over the fixture store.
    pub fn publisher(&self) -> Publisher<MemoryStore> {
        Publisher::new(self.keypair.clone(), self.store.clone(), self.config())
    }

    /// A reader over the fixture store and chain.
    pub fn reader(&self) -> Reader<MemoryStore, Arc<MemoryChain>> {
        Reader::new(self.store.clone(), self.chain.clone())
    }

    /// Sign a link at a fixed time with a random nonce.
    pub fn sign(&self, name: &str, payload_cid: &str, signed_at: u64) -> Link {
        LinkSigner::new(TEST_CHAIN_ID)
            .sign_at(
                LinkDraft::new(name, payload_cid),
                &self.keypair,
                signed_at,
                Nonce::random(),
            )
            .expect("fixture draft is valid")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[31] = (i as u8).wrapping_add(1);
            TestFixture::with_seed(seed)
        })
        .collect()
}
