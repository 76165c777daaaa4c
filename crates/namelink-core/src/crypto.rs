//! Cryptographic primitives: secp256k1 ECDSA with public-key recovery and
//! Keccak-256 hashing.
//!
//! Addresses and digests follow Ethereum conventions so the same identity can
//! sign with a plain key or through a contract wallet.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Prefix of an EIP-191 personal message.
pub const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// EIP-191 personal message digest:
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`.
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX);
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// A 20-byte account address.
///
/// Text form is `0x` followed by 40 lower-case hex digits. Parsing accepts
/// any letter case (including EIP-55 checksummed input).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lower-case `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Derive the address of a secp256k1 public key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // Skip the 0x04 SEC1 tag
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..]);
        Self(out)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(strip_0x(s)).map_err(|e| CoreError::MalformedAddress(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| CoreError::MalformedAddress(format!("expected 20 bytes: {}", s)))?;
        Ok(Self(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A compressed (33-byte SEC1) secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 33]);

impl PublicKey {
    /// Lower-case `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex (compressed or uncompressed SEC1).
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(strip_0x(s)).map_err(|e| CoreError::MalformedPublicKey(e.to_string()))?;
        let key = VerifyingKey::from_sec1_bytes(&bytes)
            .map_err(|_| CoreError::MalformedPublicKey("not a secp256k1 point".into()))?;
        Ok(Self::from_verifying_key(&key))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        Self(out)
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Result<Address> {
        let key = VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|_| CoreError::MalformedPublicKey("not a secp256k1 point".into()))?;
        Ok(Address::from_verifying_key(&key))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..18])
    }
}

/// A 65-byte recoverable ECDSA signature: `r || s || v`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; 65]);

impl RecoverableSignature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice, checking only the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 65] = bytes.try_into().map_err(|_| {
            CoreError::MalformedSignature(format!("expected 65 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Lower-case `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// The recovery id, accepting both `{0, 1}` and `{27, 28}` for `v`.
    pub fn recovery_id(&self) -> Result<RecoveryId> {
        let v = match self.0[64] {
            0 | 27 => 0,
            1 | 28 => 1,
            other => {
                return Err(CoreError::MalformedSignature(format!(
                    "invalid recovery byte {}",
                    other
                )))
            }
        };
        RecoveryId::from_byte(v)
            .ok_or_else(|| CoreError::MalformedSignature("invalid recovery id".into()))
    }

    /// The `(r, s)` part as a k256 signature.
    ///
    /// Fails if either scalar is zero or out of range.
    pub fn ecdsa(&self) -> Result<EcdsaSignature> {
        EcdsaSignature::from_slice(&self.0[..64])
            .map_err(|_| CoreError::MalformedSignature("r or s out of range".into()))
    }

    /// Check the encoding without doing any curve arithmetic.
    pub fn check_well_formed(&self) -> Result<()> {
        self.recovery_id()?;
        self.ecdsa()?;
        Ok(())
    }

    /// Recover the address that produced this signature over `digest`.
    ///
    /// Returns [`CoreError::Unrecoverable`] when the encoding is fine but no
    /// key matches (including high-`s` signatures).
    pub fn recover(&self, digest: &[u8; 32]) -> Result<Address> {
        let recovery_id = self.recovery_id()?;
        let signature = self.ecdsa()?;
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|_| CoreError::Unrecoverable)?;
        Ok(Address::from_verifying_key(&key))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..18])
    }
}

impl FromStr for RecoverableSignature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(strip_0x(s)).map_err(|e| CoreError::MalformedSignature(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A secp256k1 keypair for signing links.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Create from a 32-byte secret scalar.
    ///
    /// Fails if the scalar is zero or not below the curve order.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(seed).map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// The compressed public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        Address::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest, producing `r || s || v` with `v ∈ {27, 28}`.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<RecoverableSignature> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(RecoverableSignature(out))
    }

    /// Get the raw secret scalar.
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.address())
    }
}
