//! Proptest generators for property-based testing.

use proptest::prelude::*;

use namelink_core::{Cid, Keypair, Link, LinkDraft, LinkSigner, Nonce};

/// Generate a random keypair.
///
/// Rejects the rare seeds that are not valid secp256k1 scalars.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_filter_map("invalid secret scalar", |seed| Keypair::from_seed(&seed).ok())
}

/// Generate a random Cid.
pub fn cid() -> impl Strategy<Value = Cid> {
    any::<[u8; 32]>().prop_map(Cid::from_digest)
}

/// Generate a random nonce.
pub fn nonce() -> impl Strategy<Value = Nonce> {
    any::<[u8; 16]>().prop_map(Nonce::from_bytes)
}

/// Generate a link name, mixed case.
pub fn link_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_.-]{0,31}".prop_map(String::from)
}

/// Generate an opaque payload CID string.
pub fn payload_cid() -> impl Strategy<Value = String> {
    "Qm[1-9A-HJ-NP-Za-km-z]{1,44}".prop_map(String::from)
}

/// Generate a chain id.
pub fn chain_id() -> impl Strategy<Value = u64> {
    prop_oneof![Just(1u64), Just(100u64), Just(137u64), 1u64..=u64::MAX]
}

/// Generate an unsigned draft, sometimes encrypted.
pub fn draft() -> impl Strategy<Value = LinkDraft> {
    (
        link_name(),
        payload_cid(),
        proptest::option::of(("[a-z0-9-]{1,16}", "[a-f0-9]{8,40}")),
    )
        .prop_map(|(name, cid, encryption)| {
            let draft = LinkDraft::new(name, cid);
            match encryption {
                Some((algorithm, fingerprint)) => draft.encrypted(algorithm, fingerprint),
                None => draft,
            }
        })
}

/// Parameters for generating a signed link.
#[derive(Debug, Clone)]
pub struct LinkParams {
    pub keypair: Keypair,
    pub chain_id: u64,
    pub draft: LinkDraft,
    pub signed_at: u64,
    pub nonce: Nonce,
}

impl Arbitrary for LinkParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (keypair(), chain_id(), draft(), 0u64..=4_000_000_000u64, nonce())
            .prop_map(|(keypair, chain_id, draft, signed_at, nonce)| LinkParams {
                keypair,
                chain_id,
                draft,
                signed_at,
                nonce,
            })
            .boxed()
    }
}

/// Sign a link from parameters.
pub fn link_from_params(params: &LinkParams) -> Link {
    LinkSigner::new(params.chain_id)
        .sign_at(
            params.draft.clone(),
            &params.keypair,
            params.signed_at,
            params.nonce,
        )
        .expect("generated drafts are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use namelink_core::{encode_for_signing, Chunk};

    proptest! {
        #[test]
        fn test_signing_deterministic(params: LinkParams) {
            let l1 = link_from_params(&params);
            let l2 = link_from_params(&params);

            prop_assert_eq!(&l1.signature, &l2.signature);
            prop_assert_eq!(encode_for_signing(&l1.body), encode_for_signing(&l2.body));
        }

        #[test]
        fn test_signature_recovers_signer(params: LinkParams) {
            let link = link_from_params(&params);
            let recovered = link.signature.recover(&link.body.signing_digest()).unwrap();
            prop_assert_eq!(recovered, params.keypair.address());
        }

        #[test]
        fn test_chunk_bytes_roundtrip(params: LinkParams, prev in proptest::option::of(cid())) {
            let chunk = Chunk::single(prev, link_from_params(&params));
            let decoded = Chunk::from_bytes(&chunk.to_bytes()).unwrap();
            prop_assert_eq!(decoded.cid(), chunk.cid());
            prop_assert_eq!(decoded, chunk);
        }

        #[test]
        fn test_different_payload_different_digest(
            params: LinkParams,
            other in payload_cid(),
        ) {
            prop_assume!(other != params.draft.payload_cid);
            let mut changed = params.clone();
            changed.draft.payload_cid = other;

            prop_assert_ne!(
                link_from_params(&params).body.signing_digest(),
                link_from_params(&changed).body.signing_digest()
            );
        }
    }
}
