//! Property-based tests over the codec and the decryption engine
//!
//! These exercise the pure layers with arbitrary inputs; the async
//! dispatcher paths are covered by the deterministic tests.

use proptest::prelude::*;

use crate::crypto::EventCipher;
use crate::error::{ListenerError, ParseError};
use crate::payload::{
    decode_abi_bytes, encode_abi_bytes, EncryptedPayload, PayloadCodec, TrailerFormat,
};
use crate::types::{amount_from_be_bytes, AesKey, KeyHash, NONCE_LENGTH, TAG_LENGTH};

fn arb_nonce() -> impl Strategy<Value = [u8; NONCE_LENGTH]> {
    any::<[u8; NONCE_LENGTH]>()
}

fn arb_key() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

proptest! {
    #[test]
    fn codec_roundtrips_any_payload(
        ciphertext in proptest::collection::vec(any::<u8>(), TAG_LENGTH..128),
        nonce in arb_nonce(),
        hash in any::<[u8; 32]>(),
    ) {
        for trailer in [TrailerFormat::None, TrailerFormat::KeyHash] {
            let codec = PayloadCodec::new(trailer);
            let payload = EncryptedPayload {
                ciphertext: ciphertext.clone(),
                nonce,
                key_hash: match trailer {
                    TrailerFormat::None => None,
                    TrailerFormat::KeyHash => Some(KeyHash(hash)),
                },
            };
            prop_assert_eq!(codec.decode(&codec.encode(&payload))?, payload);
        }
    }

    #[test]
    fn undersized_wire_never_decodes(
        bytes in proptest::collection::vec(any::<u8>(), 1..NONCE_LENGTH),
    ) {
        let result = PayloadCodec::default().decode(&bytes);
        prop_assert!(
            matches!(result, Err(ParseError::PayloadTooShort { .. })),
            "unexpected decode result: {:?}",
            result,
        );
    }

    #[test]
    fn seal_open_roundtrips_any_amount(
        key in arb_key(),
        nonce in arb_nonce(),
        amount in any::<u128>(),
    ) {
        let cipher = EventCipher::new(&AesKey::from_bytes(key));
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());

        let sealed = cipher.encrypt(&nonce, &word);
        let opened = cipher.decrypt(&nonce, &sealed)?;
        prop_assert_eq!(amount_from_be_bytes(&opened)?, amount);
    }

    #[test]
    fn wrong_key_never_opens(
        key in arb_key(),
        other in arb_key(),
        nonce in arb_nonce(),
        amount in any::<u128>(),
    ) {
        prop_assume!(key != other);

        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());
        let sealed = EventCipher::new(&AesKey::from_bytes(key)).encrypt(&nonce, &word);

        let result = EventCipher::new(&AesKey::from_bytes(other)).decrypt(&nonce, &sealed);
        prop_assert!(matches!(result, Err(ListenerError::Authentication)));
    }

    #[test]
    fn flipping_any_bit_breaks_authentication(
        key in arb_key(),
        nonce in arb_nonce(),
        amount in any::<u128>(),
        bit in 0usize..(32 + TAG_LENGTH) * 8,
    ) {
        let cipher = EventCipher::new(&AesKey::from_bytes(key));
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());

        let mut sealed = cipher.encrypt(&nonce, &word);
        sealed[bit / 8] ^= 1 << (bit % 8);

        prop_assert!(matches!(
            cipher.decrypt(&nonce, &sealed),
            Err(ListenerError::Authentication)
        ));
    }

    #[test]
    fn abi_bytes_roundtrips(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        let data = encode_abi_bytes(&payload);
        prop_assert_eq!(data.len() % 32, 0);
        prop_assert_eq!(decode_abi_bytes(&data)?, payload);
    }

    #[test]
    fn amount_word_roundtrips(amount in any::<u128>()) {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());
        prop_assert_eq!(amount_from_be_bytes(&word)?, amount);
    }

    #[test]
    fn amounts_above_128_bits_are_rejected(
        amount in any::<u128>(),
        high_byte in 1u8..=255,
        high_index in 0usize..16,
    ) {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());
        word[high_index] = high_byte;
        prop_assert_eq!(amount_from_be_bytes(&word), Err(ParseError::AmountOverflow));
    }
}
