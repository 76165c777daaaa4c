//! Canonical CBOR encoding for deterministic serialization.
//!
//! Links and chunks are encoded as CBOR maps (RFC 8949) with the
//! deterministic rules of §4.2.1:
//! - Map keys: the lower camel-case wire names, sorted by CBOR-encoded bytes
//! - Integers: smallest valid encoding
//! - Lengths: definite only
//! - No floats, no nulls: absent optional fields are omitted
//!
//! Addresses, nonces and signatures are encoded as byte strings, so the
//! result does not depend on how their hex text happened to be cased.
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break all existing signatures.

use ciborium::value::Value;

use crate::chunk::Chunk;
use crate::cid::Cid;
use crate::crypto::{personal_message_digest, Address, RecoverableSignature};
use crate::error::{CoreError, Result};
use crate::link::{Link, LinkBody};
use crate::types::Nonce;

/// CBOR map key names.
mod keys {
    pub const SCHEMA_VERSION: &str = "schemaVersion";
    pub const NAME: &str = "name";
    pub const PAYLOAD_CID: &str = "payloadCid";
    pub const ENCRYPTED: &str = "encrypted";
    pub const ENCRYPTION_ALGORITHM: &str = "encryptionAlgorithm";
    pub const ENCRYPTION_KEY_FINGERPRINT: &str = "encryptionKeyFingerprint";
    pub const CHAIN_ID: &str = "chainId";
    pub const SIGNER_ADDRESS: &str = "signerAddress";
    pub const SIGNED_AT: &str = "signedAt";
    pub const NONCE: &str = "nonce";
    pub const SIGNATURE: &str = "signature";
    pub const PREV: &str = "prev";
    pub const LINKS: &str = "links";
}

/// A value in canonical form.
///
/// Only the shapes the canonical encoding allows: unsigned integers, byte
/// and text strings, booleans, arrays and text-keyed maps.
#[derive(Debug, Clone)]
enum Canon {
    Uint(u64),
    Bytes(Vec<u8>),
    Text(String),
    Bool(bool),
    Array(Vec<Canon>),
    Map(Vec<(&'static str, Canon)>),
}

/// Encode a link body to the canonical bytes a signature covers.
///
/// The signature is never part of this encoding; [`LinkBody`] has no
/// signature field to begin with.
pub fn encode_for_signing(body: &LinkBody) -> Vec<u8> {
    encode_cbor_canonical(&Canon::Map(body_entries(body)))
}

/// Digest of the canonical bytes, as an EIP-191 personal message.
pub fn signing_digest(body: &LinkBody) -> [u8; 32] {
    personal_message_digest(&encode_for_signing(body))
}

/// Encode a full link (including its signature).
pub fn encode_link(link: &Link) -> Vec<u8> {
    encode_cbor_canonical(&link_to_value(link))
}

/// Encode a chunk. Its CID is the sha2-256 of these bytes.
pub fn encode_chunk(chunk: &Chunk) -> Vec<u8> {
    let mut entries = vec![(
        keys::LINKS,
        Canon::Array(chunk.links.iter().map(link_to_value).collect()),
    )];
    if let Some(prev) = &chunk.prev {
        entries.push((keys::PREV, Canon::Text(prev.to_string())));
    }
    encode_cbor_canonical(&Canon::Map(entries))
}

/// Map entries for the signed fields, in schema order.
///
/// The order here does not matter for the output; the map encoder sorts.
fn body_entries(body: &LinkBody) -> Vec<(&'static str, Canon)> {
    let mut entries = Vec::with_capacity(11);

    entries.push((keys::SCHEMA_VERSION, Canon::Uint(body.schema_version.into())));
    entries.push((keys::NAME, Canon::Text(body.name.clone())));
    entries.push((keys::PAYLOAD_CID, Canon::Text(body.payload_cid.clone())));
    entries.push((keys::ENCRYPTED, Canon::Bool(body.encrypted)));

    if let Some(algorithm) = &body.encryption_algorithm {
        entries.push((keys::ENCRYPTION_ALGORITHM, Canon::Text(algorithm.clone())));
    }
    if let Some(fingerprint) = &body.encryption_key_fingerprint {
        entries.push((keys::ENCRYPTION_KEY_FINGERPRINT, Canon::Text(fingerprint.clone())));
    }

    entries.push((keys::CHAIN_ID, Canon::Uint(body.chain_id)));
    entries.push((keys::SIGNER_ADDRESS, Canon::Bytes(body.signer_address.0.to_vec())));
    entries.push((keys::SIGNED_AT, Canon::Uint(body.signed_at)));
    entries.push((keys::NONCE, Canon::Bytes(body.nonce.0.to_vec())));

    entries
}

fn link_to_value(link: &Link) -> Canon {
    let mut entries = body_entries(&link.body);
    entries.push((keys::SIGNATURE, Canon::Bytes(link.signature.0.to_vec())));
    Canon::Map(entries)
}

/// Encode a canonical value to bytes.
fn encode_cbor_canonical(value: &Canon) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a canonical value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Canon) {
    match value {
        Canon::Uint(n) => encode_uint(buf, 0, *n),
        Canon::Bytes(b) => encode_bytes(buf, b),
        Canon::Text(s) => encode_text(buf, s),
        Canon::Array(arr) => encode_array(buf, arr),
        Canon::Map(entries) => encode_map_canonical(buf, entries),
        Canon::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Canon]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(&'static str, Canon)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Canon)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_text(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Decode a chunk from its stored bytes.
///
/// Unknown map keys are ignored so newer writers can extend the format.
pub fn decode_chunk(bytes: &[u8]) -> Result<Chunk> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = match &value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedChunk("expected map".into())),
    };

    let prev = match lookup(map, keys::PREV) {
        Some(Value::Text(s)) => Some(s.parse::<Cid>()?),
        None => None,
        _ => return Err(CoreError::MalformedChunk("invalid prev".into())),
    };

    let links = match lookup(map, keys::LINKS) {
        Some(Value::Array(items)) => items
            .iter()
            .map(value_to_link)
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(CoreError::MalformedChunk("missing or invalid links".into())),
    };

    Ok(Chunk { prev, links })
}

/// Find a value by text key.
fn lookup<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
        .map(|(_, v)| v)
}

fn malformed(field: &str) -> CoreError {
    CoreError::MalformedChunk(format!("invalid link field {}", field))
}

fn required_text(map: &[(Value, Value)], key: &str) -> Result<String> {
    match lookup(map, key) {
        Some(Value::Text(s)) => Ok(s.clone()),
        _ => Err(malformed(key)),
    }
}

fn optional_text(map: &[(Value, Value)], key: &str) -> Result<Option<String>> {
    match lookup(map, key) {
        Some(Value::Text(s)) => Ok(Some(s.clone())),
        None => Ok(None),
        _ => Err(malformed(key)),
    }
}

fn required_uint(map: &[(Value, Value)], key: &str) -> Result<u64> {
    match lookup(map, key) {
        Some(Value::Integer(i)) => u64::try_from(*i).map_err(|_| malformed(key)),
        _ => Err(malformed(key)),
    }
}

fn required_bytes<const N: usize>(map: &[(Value, Value)], key: &str) -> Result<[u8; N]> {
    match lookup(map, key) {
        Some(Value::Bytes(b)) => b.as_slice().try_into().map_err(|_| malformed(key)),
        _ => Err(malformed(key)),
    }
}

fn value_to_link(value: &Value) -> Result<Link> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedChunk("link is not a map".into())),
    };

    let schema_version = u8::try_from(required_uint(map, keys::SCHEMA_VERSION)?)
        .map_err(|_| malformed(keys::SCHEMA_VERSION))?;

    let encrypted = match lookup(map, keys::ENCRYPTED) {
        Some(Value::Bool(b)) => *b,
        _ => return Err(malformed(keys::ENCRYPTED)),
    };

    let body = LinkBody {
        schema_version,
        name: required_text(map, keys::NAME)?,
        payload_cid: required_text(map, keys::PAYLOAD_CID)?,
        encrypted,
        encryption_algorithm: optional_text(map, keys::ENCRYPTION_ALGORITHM)?,
        encryption_key_fingerprint: optional_text(map, keys::ENCRYPTION_KEY_FINGERPRINT)?,
        chain_id: required_uint(map, keys::CHAIN_ID)?,
        signer_address: Address::from_bytes(required_bytes(map, keys::SIGNER_ADDRESS)?),
        signed_at: required_uint(map, keys::SIGNED_AT)?,
        nonce: Nonce::from_bytes(required_bytes(map, keys::NONCE)?),
    };

    Ok(Link {
        body,
        signature: RecoverableSignature::from_bytes(required_bytes(map, keys::SIGNATURE)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkDraft;

    fn sample_body() -> LinkBody {
        LinkDraft::new("avatar", "Qm123")
            .into_body(
                100,
                Address::from_bytes([0xab; 20]),
                1_700_000_000,
                Nonce::from_bytes([0x01; 16]),
            )
            .unwrap()
    }

    #[test]
    fn test_encoding_deterministic() {
        let body = sample_body();
        assert_eq!(encode_for_signing(&body), encode_for_signing(&body.clone()));
    }

    #[test]
    fn test_field_insertion_order_irrelevant() {
        let body = sample_body();

        let mut reversed = body_entries(&body);
        reversed.reverse();
        let from_reversed = encode_cbor_canonical(&Canon::Map(reversed));

        assert_eq!(from_reversed, encode_for_signing(&body));
    }

    #[test]
    fn test_signature_excluded() {
        let body = sample_body();
        let a = Link {
            body: body.clone(),
            signature: RecoverableSignature::from_bytes([0x01; 65]),
        };
        let b = Link {
            body,
            signature: RecoverableSignature::from_bytes([0x02; 65]),
        };

        assert_eq!(a.body.signing_bytes(), b.body.signing_bytes());
        assert_ne!(encode_link(&a), encode_link(&b));
    }

    #[test]
    fn test_absent_optionals_omitted() {
        let plain = encode_for_signing(&sample_body());
        // 8 entries: schemaVersion, name, payloadCid, encrypted, chainId,
        // signerAddress, signedAt, nonce; no encryption metadata
        assert_eq!(plain[0], 0xa8);

        let mut encrypted = sample_body();
        encrypted.encrypted = true;
        encrypted.encryption_algorithm = Some("x25519-xsalsa20-poly1305".into());
        encrypted.encryption_key_fingerprint = Some("fp".into());
        let bytes = encode_for_signing(&encrypted);
        assert_eq!(bytes[0], 0xaa);
    }

    #[test]
    fn test_shortest_keys_first() {
        let bytes = encode_for_signing(&sample_body());
        // "name" (4 bytes) sorts before every longer key: 0x64 'n' 'a' 'm' 'e'
        assert_eq!(&bytes[1..6], &[0x64, b'n', b'a', b'm', b'e']);
        // value "avatar"
        assert_eq!(&bytes[6..13], &[0x66, b'a', b'v', b'a', b't', b'a', b'r']);
        // then "nonce" (5 bytes) with a 16-byte bstr
        assert_eq!(&bytes[13..19], &[0x65, b'n', b'o', b'n', b'c', b'e']);
        assert_eq!(bytes[19], 0x50);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 1_700_000_000);
        assert_eq!(buf, vec![0x1a, 0x65, 0x53, 0xf1, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, u64::MAX);
        assert_eq!(buf[0], 0x1b);
        assert_eq!(buf.len(), 9);
    }

    #[test]
    fn test_chunk_roundtrip() {
        let link = Link {
            body: sample_body(),
            signature: RecoverableSignature::from_bytes([0x07; 65]),
        };
        let chunk = Chunk {
            prev: Some(Cid::for_bytes(b"older")),
            links: vec![link.clone(), link],
        };

        let bytes = encode_chunk(&chunk);
        assert_eq!(decode_chunk(&bytes).unwrap(), chunk);

        let tail = Chunk {
            prev: None,
            links: chunk.links.clone(),
        };
        let tail_bytes = encode_chunk(&tail);
        assert_eq!(tail_bytes[0], 0xa1);
        assert_eq!(decode_chunk(&tail_bytes).unwrap().prev, None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_chunk(b"not cbor at all").is_err());

        let not_a_map = encode_cbor_canonical(&Canon::Array(vec![]));
        assert!(matches!(
            decode_chunk(&not_a_map),
            Err(CoreError::MalformedChunk(_))
        ));

        let bad_prev = encode_cbor_canonical(&Canon::Map(vec![
            (keys::LINKS, Canon::Array(vec![])),
            (keys::PREV, Canon::Text("Qm123".into())),
        ]));
        assert!(matches!(
            decode_chunk(&bad_prev),
            Err(CoreError::MalformedCid(_))
        ));
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let extended = encode_cbor_canonical(&Canon::Map(vec![
            (keys::LINKS, Canon::Array(vec![])),
            ("futureField", Canon::Uint(7)),
        ]));
        let chunk = decode_chunk(&extended).unwrap();
        assert!(chunk.links.is_empty());
        assert!(chunk.prev.is_none());
    }
}
