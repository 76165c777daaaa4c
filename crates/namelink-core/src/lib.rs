//! # Namelink Core
//!
//! Pure primitives for namelink: content identifiers, canonical link
//! encoding, signing, and the chunk / index / profile data model.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Link`] - A signed pointer from a name to a payload CID
//! - [`Chunk`] - An immutable, content-addressed batch of links
//! - [`NameIndex`] - The mutable head pointer of one namespace
//! - [`Profile`] - Namespace heads and signing keys of one identity
//! - [`Cid`] - CIDv0 content identifier (sha2-256)
//!
//! ## Canonicalization
//!
//! Links are signed over deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod chunk;
pub mod cid;
pub mod crypto;
pub mod error;
pub mod index;
pub mod link;
pub mod profile;
pub mod signer;
pub mod types;

pub use canonical::{encode_for_signing, signing_digest};
pub use chunk::Chunk;
pub use cid::{cid_to_digest, digest_to_cid, Cid};
pub use crypto::{Address, Keypair, PublicKey, RecoverableSignature};
pub use error::{CoreError, Result};
pub use index::NameIndex;
pub use link::{Link, LinkBody, LinkDraft, LINK_SCHEMA_VERSION};
pub use profile::{KeyStatus, Profile, SigningKey};
pub use signer::{sign_body, KeyProvider, LinkSigner};
pub use types::{normalize_key, now_secs, Nonce};
