//! Profile: the root record a reader starts from.
//!
//! A profile maps namespace keys to the head chunk of each namespace and
//! key fingerprints to their [`SigningKey`] lifecycle metadata. Descriptive
//! fields are carried along but play no part in the protocol.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cid::Cid;
use crate::crypto::{Address, PublicKey};
use crate::error::{CoreError, Result};
use crate::types::normalize_key;

/// Lifecycle state of a signing key at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Inside its validity window and not revoked.
    Active,
    /// `t` is before `validFrom`.
    NotYetValid,
    /// `t` is at or after `validTo`.
    Expired,
    /// `t` is at or after `revokedAt`.
    Revoked { at: u64 },
    /// The profile has no key with this fingerprint.
    NotRegistered,
}

impl KeyStatus {
    /// Whether signatures at this time are acceptable.
    pub fn is_active(&self) -> bool {
        matches!(self, KeyStatus::Active)
    }
}

/// A registered signing key and its validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningKey {
    /// Hex public key, or the wallet address for a contract wallet.
    pub public_key: String,

    /// Unix seconds, inclusive.
    pub valid_from: u64,

    /// Unix seconds, exclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<u64>,
}

impl SigningKey {
    /// A secp256k1 key valid from `valid_from` onwards.
    pub fn new(public_key: &PublicKey, valid_from: u64) -> Self {
        Self {
            public_key: public_key.to_hex(),
            valid_from,
            valid_to: None,
            revoked_at: None,
        }
    }

    /// A contract wallet, registered by address.
    pub fn for_wallet(wallet: &Address, valid_from: u64) -> Self {
        Self {
            public_key: wallet.to_hex(),
            valid_from,
            valid_to: None,
            revoked_at: None,
        }
    }

    /// Set the exclusive upper bound of the validity window.
    pub fn valid_until(mut self, valid_to: u64) -> Self {
        self.valid_to = Some(valid_to);
        self
    }

    /// The address this key signs as.
    ///
    /// A 20-byte entry is taken to be a wallet address as-is; anything else
    /// must parse as a secp256k1 public key.
    pub fn fingerprint(&self) -> Result<Address> {
        match self.public_key.parse::<Address>() {
            Ok(address) => Ok(address),
            Err(_) => PublicKey::from_hex(&self.public_key)?.address(),
        }
    }

    /// Lifecycle state at time `t`. Revocation takes precedence.
    pub fn status_at(&self, t: u64) -> KeyStatus {
        if let Some(at) = self.revoked_at {
            if at <= t {
                return KeyStatus::Revoked { at };
            }
        }
        if t < self.valid_from {
            return KeyStatus::NotYetValid;
        }
        match self.valid_to {
            Some(valid_to) if valid_to <= t => KeyStatus::Expired,
            _ => KeyStatus::Active,
        }
    }
}

/// The per-identity directory of namespaces and signing keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Normalized namespace key -> head chunk CID.
    #[serde(default)]
    pub namespaces: BTreeMap<String, Cid>,

    /// Key fingerprint (lower-case address) -> key metadata.
    #[serde(default)]
    pub signing_keys: BTreeMap<String, SigningKey>,

    /// Fields this version does not know about, kept for round-tripping.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current head of a namespace.
    pub fn namespace_head(&self, namespace: &str) -> Option<&Cid> {
        self.namespaces.get(&normalize_key(namespace))
    }

    /// Point a namespace at a new head. Returns the previous head.
    pub fn set_namespace_head(&mut self, namespace: &str, head: Cid) -> Option<Cid> {
        self.namespaces.insert(normalize_key(namespace), head)
    }

    /// Register a signing key under its fingerprint, replacing any previous
    /// entry. Returns the fingerprint.
    pub fn register_key(&mut self, key: SigningKey) -> Result<String> {
        let fingerprint = key.fingerprint()?.to_hex();
        self.signing_keys.insert(fingerprint.clone(), key);
        Ok(fingerprint)
    }

    /// Revoke a key from time `at`.
    ///
    /// An earlier revocation is kept. Returns `false` if no such key exists.
    pub fn revoke_key(&mut self, fingerprint: &str, at: u64) -> bool {
        let Some(key) = self.signing_keys.get_mut(&normalize_key(fingerprint)) else {
            return false;
        };
        key.revoked_at = Some(key.revoked_at.map_or(at, |prev| prev.min(at)));
        true
    }

    /// The key registered for a signer address.
    pub fn signing_key(&self, signer: &Address) -> Option<&SigningKey> {
        self.signing_keys.get(&signer.to_hex())
    }

    /// Lifecycle state of the key for `signer` at time `t`.
    pub fn key_status(&self, signer: &Address, t: u64) -> KeyStatus {
        self.signing_key(signer)
            .map_or(KeyStatus::NotRegistered, |key| key.status_at(t))
    }

    /// Parse from the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut profile: Self =
            serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        profile.namespaces = std::mem::take(&mut profile.namespaces)
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect();
        profile.signing_keys = std::mem::take(&mut profile.signing_keys)
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect();
        Ok(profile)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }
}
