//! Error types for publishing and reading.

use namelink_core::CoreError;
use namelink_store::StoreError;
use namelink_verify::VerifyError;
use thiserror::Error;

/// Errors that can occur during namelink operations.
#[derive(Debug, Error)]
pub enum NamelinkError {
    /// Malformed input or encoding failure.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Verification could not be carried out.
    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),

    /// Every append attempt lost the race for the namespace head.
    #[error("append to namespace {namespace} still conflicting after {attempts} attempts")]
    AppendConflictExhausted { namespace: String, attempts: u32 },

    /// Every profile update lost the race for the profile revision.
    #[error("profile update still conflicting after {attempts} attempts")]
    ProfileConflictExhausted { attempts: u32 },

    /// The chunk chain is inconsistent: cycle, runaway length, or an index
    /// entry pointing at a chunk that does not hold the name.
    #[error("corrupt chain: {0}")]
    CorruptChain(String),

    /// The owner has no index for this namespace.
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// Invalid operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration could not be loaded.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl NamelinkError {
    /// Whether the caller may retry the operation with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            NamelinkError::Store(e) => e.is_transient(),
            NamelinkError::Verify(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result type for namelink operations.
pub type Result<T> = std::result::Result<T, NamelinkError>;
