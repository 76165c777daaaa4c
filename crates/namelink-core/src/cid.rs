//! Content identifiers.
//!
//! CIDs use the CIDv0 text form: a sha2-256 multihash (`0x12 0x20 || digest`)
//! encoded as base58btc. Every CID is exactly 46 characters and starts with
//! `Qm`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Multihash code for sha2-256.
pub const SHA2_256_CODE: u8 = 0x12;

/// Digest length carried in the multihash header.
pub const SHA2_256_LEN: u8 = 0x20;

/// Length of a CIDv0 in base58 characters.
pub const CID_TEXT_LEN: usize = 46;

/// Wrap a sha2-256 digest in a multihash header and base58-encode it.
pub fn digest_to_cid(digest: &[u8; 32]) -> String {
    let mut buf = Vec::with_capacity(34);
    buf.push(SHA2_256_CODE);
    buf.push(SHA2_256_LEN);
    buf.extend_from_slice(digest);
    bs58::encode(buf).into_string()
}

/// Inverse of [`digest_to_cid`].
///
/// Fails with [`CoreError::MalformedCid`] if the text is not base58, the
/// decoded length is wrong, or the multihash header is not sha2-256/32.
pub fn cid_to_digest(cid: &str) -> Result<[u8; 32]> {
    if cid.len() != CID_TEXT_LEN {
        return Err(CoreError::MalformedCid(format!(
            "expected {} characters, got {}",
            CID_TEXT_LEN,
            cid.len()
        )));
    }

    let bytes = bs58::decode(cid)
        .into_vec()
        .map_err(|e| CoreError::MalformedCid(e.to_string()))?;

    if bytes.len() != 34 {
        return Err(CoreError::MalformedCid(format!(
            "expected 34 decoded bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != SHA2_256_CODE || bytes[1] != SHA2_256_LEN {
        return Err(CoreError::MalformedCid(format!(
            "unsupported multihash header {:02x}{:02x}",
            bytes[0], bytes[1]
        )));
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&bytes[2..]);
    Ok(digest)
}

/// A validated content identifier.
///
/// Holds the raw digest; the text form is produced on demand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid([u8; 32]);

impl Cid {
    /// Create from a raw sha2-256 digest.
    pub const fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// Compute the CID of a blob.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Get the raw digest.
    pub const fn digest(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check that `bytes` hash to this CID.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        Self::for_bytes(bytes) == *self
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&digest_to_cid(&self.0))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self)
    }
}

impl FromStr for Cid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        cid_to_digest(s).map(Self)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cid_shape() {
        let cid = digest_to_cid(&[0x42; 32]);
        assert_eq!(cid.len(), CID_TEXT_LEN);
        assert!(cid.starts_with("Qm"));
    }

    #[test]
    fn test_cid_for_bytes_matches_digest() {
        let cid = Cid::for_bytes(b"hello");
        let expected: [u8; 32] = Sha256::digest(b"hello").into();
        assert_eq!(cid.digest(), &expected);
        assert!(cid.matches(b"hello"));
        assert!(!cid.matches(b"hello!"));
    }

    #[test]
    fn test_reject_wrong_alphabet() {
        // '0', 'O', 'I' and 'l' are not in the base58 alphabet
        let mut bad = digest_to_cid(&[0x01; 32]);
        bad.replace_range(10..11, "0");
        assert!(matches!(cid_to_digest(&bad), Err(CoreError::MalformedCid(_))));
    }

    #[test]
    fn test_reject_wrong_length() {
        assert!(matches!(cid_to_digest("Qm123"), Err(CoreError::MalformedCid(_))));
        assert!(matches!(cid_to_digest(""), Err(CoreError::MalformedCid(_))));
    }

    #[test]
    fn test_reject_wrong_header() {
        // sha3-256 (0x16) header, otherwise well formed
        let mut buf = vec![0x16, 0x20];
        buf.extend_from_slice(&[0x07; 32]);
        let text = bs58::encode(buf).into_string();
        assert_eq!(text.len(), CID_TEXT_LEN);
        assert!(matches!(cid_to_digest(&text), Err(CoreError::MalformedCid(_))));
    }

    #[test]
    fn test_cid_serde_as_text() {
        let cid = Cid::for_bytes(b"chunk");
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"{}\"", cid));
        let back: Cid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cid);

        assert!(serde_json::from_str::<Cid>("\"Qm123\"").is_err());
    }

    proptest! {
        #[test]
        fn test_digest_cid_bijection(digest in any::<[u8; 32]>()) {
            let text = digest_to_cid(&digest);
            prop_assert_eq!(cid_to_digest(&text).unwrap(), digest);
        }

        #[test]
        fn test_arbitrary_text_never_panics(s in "\\PC{0,60}") {
            let _ = cid_to_digest(&s);
        }
    }
}
