//! The chain collaborator: code probe and read-only contract calls.

use std::sync::Arc;

use async_trait::async_trait;
use namelink_core::Address;

use crate::error::ChainError;

/// Result of a read-only contract call that reached the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call completed and returned these bytes.
    Returned(Vec<u8>),
    /// The call reverted.
    Reverted,
}

/// Read access to a chain.
///
/// Implementations wrap an RPC client. Calls may block on the network;
/// a transport failure is a [`ChainError`], a revert is a [`CallOutcome`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The chain this client talks to.
    fn chain_id(&self) -> u64;

    /// Whether any contract code is deployed at `address`.
    async fn has_code(&self, address: &Address) -> Result<bool, ChainError>;

    /// Execute a read-only call against `to`.
    async fn call(&self, to: &Address, data: &[u8]) -> Result<CallOutcome, ChainError>;
}

#[async_trait]
impl<C: ChainClient + ?Sized> ChainClient for Arc<C> {
    fn chain_id(&self) -> u64 {
        (**self).chain_id()
    }

    async fn has_code(&self, address: &Address) -> Result<bool, ChainError> {
        (**self).has_code(address).await
    }

    async fn call(&self, to: &Address, data: &[u8]) -> Result<CallOutcome, ChainError> {
        (**self).call(to, data).await
    }
}
