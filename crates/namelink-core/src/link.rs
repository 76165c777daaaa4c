//! Link: a signed, replay-protected pointer to a payload.
//!
//! A link is immutable once signed. Publishing a new version of a name means
//! signing a new link with the same name.

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::crypto::{Address, RecoverableSignature};
use crate::error::{CoreError, Result};
use crate::types::{normalize_key, Nonce};

/// The current link schema version.
pub const LINK_SCHEMA_VERSION: u8 = 1;

fn default_schema_version() -> u8 {
    LINK_SCHEMA_VERSION
}

/// Every signed field of a link. The signature covers exactly this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkBody {
    /// Schema version (currently 1).
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,

    /// Logical name, compared case-insensitively.
    pub name: String,

    /// Content identifier of the referenced payload, as issued by the blob store.
    #[serde(alias = "cid")]
    pub payload_cid: String,

    /// Whether the payload is encrypted. Opaque to this crate.
    #[serde(default)]
    pub encrypted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_algorithm: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_fingerprint: Option<String>,

    /// Chain the signature is bound to.
    pub chain_id: u64,

    /// Account that signed the link (EOA or contract wallet).
    pub signer_address: Address,

    /// Unix seconds.
    pub signed_at: u64,

    pub nonce: Nonce,
}

impl LinkBody {
    /// The name in lookup form.
    pub fn normalized_name(&self) -> String {
        normalize_key(&self.name)
    }

    /// Canonical bytes covered by the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        canonical::encode_for_signing(self)
    }

    /// The digest that gets signed and recovered against.
    pub fn signing_digest(&self) -> [u8; 32] {
        canonical::signing_digest(self)
    }

    /// Check required fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CoreError::MissingField("name"));
        }
        if self.payload_cid.is_empty() {
            return Err(CoreError::MissingField("payloadCid"));
        }
        Ok(())
    }
}

/// A complete link: signed body plus signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(flatten)]
    pub body: LinkBody,

    /// Recoverable ECDSA signature over [`LinkBody::signing_digest`].
    pub signature: RecoverableSignature,
}

impl Link {
    /// The link name as published.
    pub fn name(&self) -> &str {
        &self.body.name
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.body.normalized_name() == normalize_key(name)
    }

    /// The signer address.
    pub fn signer(&self) -> &Address {
        &self.body.signer_address
    }

    /// Parse a link from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }
}

/// An unsigned link, before replay-protection fields are filled in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkDraft {
    pub name: String,
    pub payload_cid: String,
    pub encrypted: bool,
    pub encryption_algorithm: Option<String>,
    pub encryption_key_fingerprint: Option<String>,
}

impl LinkDraft {
    /// Start a plaintext draft.
    pub fn new(name: impl Into<String>, payload_cid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload_cid: payload_cid.into(),
            ..Self::default()
        }
    }

    /// Mark the payload as encrypted with the given metadata.
    pub fn encrypted(
        mut self,
        algorithm: impl Into<String>,
        key_fingerprint: impl Into<String>,
    ) -> Self {
        self.encrypted = true;
        self.encryption_algorithm = Some(algorithm.into());
        self.encryption_key_fingerprint = Some(key_fingerprint.into());
        self
    }

    /// Fill in the replay-protection fields.
    pub fn into_body(
        self,
        chain_id: u64,
        signer_address: Address,
        signed_at: u64,
        nonce: Nonce,
    ) -> Result<LinkBody> {
        let body = LinkBody {
            schema_version: LINK_SCHEMA_VERSION,
            name: self.name,
            payload_cid: self.payload_cid,
            encrypted: self.encrypted,
            encryption_algorithm: self.encryption_algorithm,
            encryption_key_fingerprint: self.encryption_key_fingerprint,
            chain_id,
            signer_address,
            signed_at,
            nonce,
        };
        body.validate()?;
        Ok(body)
    }
}
