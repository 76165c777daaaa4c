//! Chunk: one immutable, content-addressed node of a namespace chain.
//!
//! Chunks point backwards through `prev`. The oldest chunk (the tail) has no
//! `prev`. A chunk's CID is the sha2-256 of its canonical encoding, so a
//! chunk can never change once another chunk or an index refers to it.

use serde::{Deserialize, Serialize};

use crate::canonical::{decode_chunk, encode_chunk};
use crate::cid::Cid;
use crate::error::Result;
use crate::link::Link;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// CID of the next-older chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Cid>,

    /// Links in append order.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Chunk {
    /// Create a chunk holding a single link.
    pub fn single(prev: Option<Cid>, link: Link) -> Self {
        Self {
            prev,
            links: vec![link],
        }
    }

    /// Canonical bytes, as stored in the content store.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_chunk(self)
    }

    /// Decode from stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode_chunk(bytes)
    }

    /// The content address of this chunk.
    pub fn cid(&self) -> Cid {
        Cid::for_bytes(&self.to_bytes())
    }

    /// Whether this is the oldest chunk of its chain.
    pub fn is_tail(&self) -> bool {
        self.prev.is_none()
    }

    /// The latest link in this chunk with the given name (case-insensitive).
    ///
    /// Later positions win over earlier ones.
    pub fn latest(&self, name: &str) -> Option<&Link> {
        self.links.iter().rev().find(|link| link.has_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Address, RecoverableSignature};
    use crate::link::LinkDraft;
    use crate::types::Nonce;

    fn link(name: &str, payload: &str, at: u64) -> Link {
        let body = LinkDraft::new(name, payload)
            .into_body(1, Address::from_bytes([0x01; 20]), at, Nonce::from_bytes([0x02; 16]))
            .unwrap();
        Link {
            body,
            signature: RecoverableSignature::from_bytes([0x03; 65]),
        }
    }

    #[test]
    fn test_cid_is_function_of_content() {
        let a = Chunk::single(None, link("avatar", "Qm1", 10));
        let b = Chunk::single(None, link("avatar", "Qm1", 10));
        assert_eq!(a.cid(), b.cid());

        let c = Chunk::single(Some(a.cid()), link("avatar", "Qm1", 10));
        assert_ne!(a.cid(), c.cid());
    }

    #[test]
    fn test_bytes_roundtrip_keeps_cid() {
        let chunk = Chunk::single(Some(Cid::for_bytes(b"x")), link("avatar", "Qm1", 10));
        let decoded = Chunk::from_bytes(&chunk.to_bytes()).unwrap();
        assert_eq!(decoded.cid(), chunk.cid());
    }

    #[test]
    fn test_latest_position_wins() {
        let chunk = Chunk {
            prev: None,
            links: vec![
                link("avatar", "Qm1", 10),
                link("banner", "Qm2", 11),
                link("AVATAR", "Qm3", 12),
            ],
        };
        assert_eq!(chunk.latest("Avatar").unwrap().body.payload_cid, "Qm3");
        assert_eq!(chunk.latest("banner").unwrap().body.payload_cid, "Qm2");
        assert!(chunk.latest("missing").is_none());
        assert!(chunk.is_tail());
    }
}
