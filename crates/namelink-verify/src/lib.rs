//! # Namelink Verify
//!
//! Signature verification for namelink links.
//!
//! A link's signer is either an externally-owned account, checked by
//! recovering the public key from the signature, or a contract wallet,
//! checked by calling its `isValidSignature` entry point on chain. Which one
//! is decided at verification time by probing the signer address for code.
//!
//! ## Key Types
//!
//! - [`SignatureVerifier`] - Runs the check against a [`ChainClient`]
//! - [`VerificationReport`] - Signer kind and [`SignatureOutcome`]
//! - [`ProfileVerification`] - The report plus the signer's key status
//! - [`MemoryChain`] - In-process chain with deployable wallets
//!
//! ## Outcomes vs errors
//!
//! A wrong signature is an expected result, not an error. Errors are
//! reserved for malformed input ([`VerifyError::MalformedSignature`],
//! [`VerifyError::UnsupportedVersion`]) and for an unreachable chain
//! ([`VerifyError::VerificationUnavailable`]), which must never be read as
//! "invalid".

pub mod chain;
pub mod eip1271;
pub mod error;
pub mod memory;
pub mod verifier;

pub use chain::{CallOutcome, ChainClient};
pub use error::{ChainError, Result, VerifyError};
pub use memory::{ContractWallet, MemoryChain, OwnerWallet};
pub use verifier::{
    InvalidReason, ProfileVerification, SignatureOutcome, SignatureVerifier, SignerKind,
    VerificationReport, VerifierConfig,
};
