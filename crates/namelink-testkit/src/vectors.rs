//! Golden test vectors for deterministic verification.
//!
//! These vectors pin key derivation and check that canonical encoding and
//! RFC 6979 signing produce identical results on every run.

use namelink_core::{Keypair, Link, LinkDraft, LinkSigner, Nonce};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Secret scalar (big-endian).
    pub secret: [u8; 32],
    /// Chain the link is bound to.
    pub chain_id: u64,
    /// Link name.
    pub link_name: &'static str,
    /// Payload CID.
    pub payload_cid: &'static str,
    /// Unix seconds.
    pub signed_at: u64,
    /// Replay-protection nonce.
    pub nonce: [u8; 16],
    /// Address derived from `secret`.
    pub expected_address: &'static str,
    /// Expected signature (hex, `0x`-prefixed).
    pub expected_signature: &'static str,
}

const fn secret(last: u8) -> [u8; 32] {
    let mut s = [0u8; 32];
    s[31] = last;
    s
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "avatar on chain 100",
            secret: secret(1),
            chain_id: 100,
            link_name: "avatar",
            payload_cid: "Qm123",
            signed_at: 1_700_000_000, // 2023-11-14T22:13:20Z
            nonce: [0x11; 16],
            expected_address: "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            expected_signature: "0x85acdf5e557eb39ce1221ffbe6e5fdeb03e45ade270d0cd9d20efd2cf70d628f0c271ca1010b697e2a4a71ad4b9075c6e534a2d74c6ec27859a258489276aecc1b",
        },
        GoldenVector {
            name: "mixed-case name on mainnet",
            secret: secret(2),
            chain_id: 1,
            link_name: "Banner",
            payload_cid: "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
            signed_at: 1_700_000_001,
            nonce: [0x22; 16],
            expected_address: "0x2b5ad5c4795c026514f8317c7a215e218dccd6cf",
            expected_signature: "0x2d1f398e46e67adec1a5387b9d0be0d25cc68341912abdbe1cadf4036806c78467505ef5ca6946c1ec995cf5503b8be2bbdd1ec0ebdd32178b92805e82fef7b31c",
        },
        GoldenVector {
            name: "zero timestamp and nonce",
            secret: secret(3),
            chain_id: 100,
            link_name: "x",
            payload_cid: "Qm0",
            signed_at: 0,
            nonce: [0x00; 16],
            expected_address: "0x6813eb9362372eef6200f3b1dbc3f819671cba69",
            expected_signature: "0x02c9d178a10a28f02b92eb488970414220d341577c606f6a3e3b2d17e2e871b543405f6eaca898c757e6c872140b5b25bcb50fb71287697238f099b1d2123edc1c",
        },
    ]
}

/// Sign the link a golden vector describes.
pub fn link_from_vector(vector: &GoldenVector) -> Link {
    let keypair = Keypair::from_seed(&vector.secret).expect("vector secret is a valid scalar");
    LinkSigner::new(vector.chain_id)
        .sign_at(
            LinkDraft::new(vector.link_name, vector.payload_cid),
            &keypair,
            vector.signed_at,
            Nonce::from_bytes(vector.nonce),
        )
        .expect("vector draft is valid")
}

/// Check every vector: derived address, signer recovery, and the pinned
/// signature.
///
/// Returns `(name, matches, signature_hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let link = link_from_vector(v);
            let signature = link.signature.to_hex();

            let address_ok = link.body.signer_address.to_hex() == v.expected_address;
            let recovers = link
                .signature
                .recover(&link.body.signing_digest())
                .map(|a| a == link.body.signer_address)
                .unwrap_or(false);
            let signature_ok = signature == v.expected_signature;

            (v.name.to_string(), address_ok && recovers && signature_ok, signature)
        })
        .collect()
}
