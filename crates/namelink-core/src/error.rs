//! Error types for namelink core.

use thiserror::Error;

/// Errors raised by the pure core: parsing, encoding and signing.
///
/// Everything here is an input error. None of these are transient and none
/// should be retried.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed CID: {0}")]
    MalformedCid(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("malformed nonce: {0}")]
    MalformedNonce(String),

    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("signature could not be recovered")]
    Unrecoverable,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("signing key unavailable")]
    SigningKeyUnavailable,

    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
