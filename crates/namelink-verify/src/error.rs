//! Error types for verification.

use thiserror::Error;

/// Failures talking to the chain collaborator.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The endpoint could not be reached or timed out.
    #[error("chain unreachable: {0}")]
    Unreachable(String),

    /// The endpoint answered with an error unrelated to the call itself.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Verification failures.
///
/// A cryptographically wrong signature is not an error; it is reported as
/// [`crate::SignatureOutcome::Invalid`].
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Signature bytes are not a well-formed `r || s || v`.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The link uses a schema version this verifier does not know.
    #[error("unsupported link schema version {0}")]
    UnsupportedVersion(u8),

    /// The verdict depends on the chain and the chain could not be asked.
    #[error("verification unavailable: {0}")]
    VerificationUnavailable(String),
}

impl VerifyError {
    /// Whether the caller may retry the operation with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, VerifyError::VerificationUnavailable(_))
    }
}

impl From<ChainError> for VerifyError {
    fn from(e: ChainError) -> Self {
        VerifyError::VerificationUnavailable(e.to_string())
    }
}

/// Result type for verification.
pub type Result<T> = std::result::Result<T, VerifyError>;
