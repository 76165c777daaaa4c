//! NameIndex: the mutable pointer record of one namespace.
//!
//! The index is not content-addressed. It names the current head chunk and,
//! for every link name ever appended, the chunk holding its latest version.
//! Keys are stored lower-cased.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::chunk::Chunk;
use crate::cid::Cid;
use crate::error::{CoreError, Result};
use crate::types::normalize_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIndex {
    /// CID of the newest chunk.
    pub head: Cid,

    /// Normalized link name -> CID of the chunk holding its latest version.
    #[serde(default, deserialize_with = "normalized_entries")]
    pub entries: BTreeMap<String, Cid>,
}

fn normalized_entries<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Cid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Cid>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, cid)| (normalize_key(&name), cid))
        .collect())
}

impl NameIndex {
    /// Index of a chain whose head is `head`, with no entries yet.
    pub fn new(head: Cid) -> Self {
        Self {
            head,
            entries: BTreeMap::new(),
        }
    }

    /// Build the successor index after `chunk` (stored as `chunk_cid`) was
    /// linked on top of `previous`.
    ///
    /// Every name in the chunk now points at the new chunk; all other
    /// entries are carried over untouched.
    pub fn advance(previous: Option<&NameIndex>, chunk_cid: Cid, chunk: &Chunk) -> Self {
        let mut entries = previous.map(|p| p.entries.clone()).unwrap_or_default();
        for link in &chunk.links {
            entries.insert(link.body.normalized_name(), chunk_cid);
        }
        Self {
            head: chunk_cid,
            entries,
        }
    }

    /// Chunk holding the latest version of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Cid> {
        self.entries.get(&normalize_key(name))
    }

    /// All indexed names (normalized).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Parse from the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Address, RecoverableSignature};
    use crate::link::{Link, LinkDraft};
    use crate::types::Nonce;

    fn chunk_with(prev: Option<Cid>, names: &[&str]) -> Chunk {
        let links = names
            .iter()
            .map(|name| Link {
                body: LinkDraft::new(*name, "Qm1")
                    .into_body(1, Address::from_bytes([0x01; 20]), 1, Nonce::from_bytes([0; 16]))
                    .unwrap(),
                signature: RecoverableSignature::from_bytes([0; 65]),
            })
            .collect();
        Chunk { prev, links }
    }

    #[test]
    fn test_advance_from_empty() {
        let chunk = chunk_with(None, &["Avatar"]);
        let cid = chunk.cid();
        let index = NameIndex::advance(None, cid, &chunk);

        assert_eq!(index.head, cid);
        assert_eq!(index.lookup("AVATAR"), Some(&cid));
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["avatar"]);
    }

    #[test]
    fn test_advance_keeps_other_entries() {
        let first = chunk_with(None, &["avatar"]);
        let first_cid = first.cid();
        let index = NameIndex::advance(None, first_cid, &first);

        let second = chunk_with(Some(first_cid), &["banner"]);
        let second_cid = second.cid();
        let index = NameIndex::advance(Some(&index), second_cid, &second);

        assert_eq!(index.head, second_cid);
        assert_eq!(index.lookup("avatar"), Some(&first_cid));
        assert_eq!(index.lookup("banner"), Some(&second_cid));
    }

    #[test]
    fn test_json_normalizes_and_ignores_unknown() {
        let cid = Cid::for_bytes(b"head");
        let json = format!(
            r#"{{"head":"{cid}","entries":{{"Avatar":"{cid}"}},"schemaVersion":1,"extra":[1,2]}}"#
        );
        let index = NameIndex::from_json(&json).unwrap();
        assert_eq!(index.lookup("avatar"), Some(&cid));

        let back = NameIndex::from_json(&index.to_json().unwrap()).unwrap();
        assert_eq!(back, index);
    }
}
