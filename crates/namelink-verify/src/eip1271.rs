//! ABI plumbing for the contract-wallet signature check
//! `isValidSignature(bytes32 hash, bytes signature) returns (bytes4)`.

/// Function selector of `isValidSignature(bytes32,bytes)`.
pub const IS_VALID_SIGNATURE_SELECTOR: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// The value a wallet returns to accept a signature. Equal to the selector.
pub const MAGIC_VALUE: [u8; 4] = IS_VALID_SIGNATURE_SELECTOR;

const WORD: usize = 32;

fn word_from_usize(n: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(n as u64).to_be_bytes());
    word
}

fn usize_from_word(word: &[u8]) -> Option<usize> {
    if word.len() != WORD || word[..WORD - 8].iter().any(|b| *b != 0) {
        return None;
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(tail)).ok()
}

/// Calldata for `isValidSignature(hash, signature)`.
///
/// Layout: selector, `hash`, offset of the dynamic argument (`0x40`),
/// signature length, signature bytes right-padded to a whole word.
pub fn encode_call(hash: &[u8; 32], signature: &[u8]) -> Vec<u8> {
    let padded = signature.len().div_ceil(WORD) * WORD;
    let mut data = Vec::with_capacity(4 + 3 * WORD + padded);

    data.extend_from_slice(&IS_VALID_SIGNATURE_SELECTOR);
    data.extend_from_slice(hash);
    data.extend_from_slice(&word_from_usize(2 * WORD));
    data.extend_from_slice(&word_from_usize(signature.len()));
    data.extend_from_slice(signature);
    data.resize(4 + 3 * WORD + padded, 0);
    data
}

/// Parse calldata produced by [`encode_call`]. `None` if it is not a
/// well-formed `isValidSignature` call.
pub fn decode_call(data: &[u8]) -> Option<([u8; 32], Vec<u8>)> {
    let args = data.strip_prefix(&IS_VALID_SIGNATURE_SELECTOR[..])?;
    if args.len() < 2 * WORD {
        return None;
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&args[..WORD]);

    let offset = usize_from_word(&args[WORD..2 * WORD])?;
    let len_end = offset.checked_add(WORD)?;
    let len = usize_from_word(args.get(offset..len_end)?)?;
    let signature = args.get(len_end..len_end.checked_add(len)?)?.to_vec();

    Some((hash, signature))
}

/// ABI return value of an accepting wallet: `bytes4` magic, left-aligned.
pub fn encode_magic_return() -> Vec<u8> {
    let mut ret = vec![0u8; WORD];
    ret[..4].copy_from_slice(&MAGIC_VALUE);
    ret
}

/// Whether a call's return data means "signature accepted".
pub fn is_magic_return(ret: &[u8]) -> bool {
    ret.len() >= WORD && ret[..4] == MAGIC_VALUE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_signature_text() {
        let hash = namelink_core::crypto::keccak256(b"isValidSignature(bytes32,bytes)");
        assert_eq!(hash[..4], IS_VALID_SIGNATURE_SELECTOR);
    }

    #[test]
    fn test_calldata_layout() {
        let hash = [0xaa; 32];
        let sig = [0x11; 65];
        let data = encode_call(&hash, &sig);

        // selector + hash + offset + length + 3 words of signature
        assert_eq!(data.len(), 4 + 32 * 3 + 96);
        assert_eq!(data[..4], IS_VALID_SIGNATURE_SELECTOR);
        assert_eq!(data[4..36], hash);
        assert_eq!(data[67], 0x40);
        assert_eq!(data[99], 65);
        assert!(data[100 + 65..].iter().all(|b| *b == 0));

        assert_eq!(decode_call(&data), Some((hash, sig.to_vec())));
    }

    #[test]
    fn test_decode_rejects_bad_calldata() {
        let data = encode_call(&[0; 32], &[1; 65]);
        assert!(decode_call(&data[..50]).is_none());
        assert!(decode_call(&data[..120]).is_none());

        let mut wrong_selector = data.clone();
        wrong_selector[0] ^= 1;
        assert!(decode_call(&wrong_selector).is_none());

        let mut huge_offset = data;
        huge_offset[40] = 0xff;
        assert!(decode_call(&huge_offset).is_none());
    }

    #[test]
    fn test_magic_return() {
        assert!(is_magic_return(&encode_magic_return()));
        assert!(!is_magic_return(&MAGIC_VALUE));
        assert!(!is_magic_return(&[0u8; 32]));
    }

    proptest::proptest! {
        #[test]
        fn decode_inverts_encode(
            hash in proptest::prelude::any::<[u8; 32]>(),
            sig in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..200),
        ) {
            proptest::prop_assert_eq!(decode_call(&encode_call(&hash, &sig)), Some((hash, sig)));
        }

        #[test]
        fn only_magic_prefix_accepted(ret in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64)) {
            let expected = ret.len() >= 32 && ret[..4] == MAGIC_VALUE;
            proptest::prop_assert_eq!(is_magic_return(&ret), expected);
        }
    }
}
