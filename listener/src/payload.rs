//! Wire codec for the encrypted-amount payload
//!
//! Current format: `ciphertext(tag-appended) ‖ nonce(12)`.
//! A legacy deployment additionally appended the 32-byte key hash:
//! `ciphertext ‖ nonce ‖ keyHash`. Which variant applies is a per-deployment
//! fact carried in the subscription configuration; it is never guessed from
//! the payload length.

use crate::error::ParseError;
use crate::types::{KeyHash, KEY_HASH_LENGTH, NONCE_LENGTH};

/// Trailing bytes after the nonce, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailerFormat {
    /// Canonical format: nothing after the nonce; the correlation tag is an
    /// indexed log field.
    #[default]
    None,
    /// Legacy format: the payload itself ends with the 32-byte key hash.
    KeyHash,
}

impl TrailerFormat {
    fn len(&self) -> usize {
        match self {
            TrailerFormat::None => 0,
            TrailerFormat::KeyHash => KEY_HASH_LENGTH,
        }
    }
}

/// The structured contents of an encrypted-amount byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// AES-GCM ciphertext with the 16-byte authentication tag appended.
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LENGTH],
    /// Only populated when the legacy trailer format is configured.
    pub key_hash: Option<KeyHash>,
}

/// Packs and unpacks the encrypted-amount byte string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec {
    trailer: TrailerFormat,
}

impl PayloadCodec {
    pub fn new(trailer: TrailerFormat) -> Self {
        Self { trailer }
    }

    pub fn trailer(&self) -> TrailerFormat {
        self.trailer
    }

    /// Split a wire payload into ciphertext, nonce, and optional trailer.
    ///
    /// An empty input is the "no payload" sentinel; callers are expected to
    /// check for it before decoding, so here it is an error.
    pub fn decode(&self, bytes: &[u8]) -> Result<EncryptedPayload, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::EmptyPayload);
        }

        let min = NONCE_LENGTH + self.trailer.len();
        if bytes.len() < min {
            return Err(ParseError::PayloadTooShort {
                len: bytes.len(),
                min,
            });
        }

        let (rest, key_hash) = match self.trailer {
            TrailerFormat::None => (bytes, None),
            TrailerFormat::KeyHash => {
                let (rest, tail) = bytes.split_at(bytes.len() - KEY_HASH_LENGTH);
                let mut hash = [0u8; KEY_HASH_LENGTH];
                hash.copy_from_slice(tail);
                (rest, Some(KeyHash(hash)))
            }
        };

        let (ciphertext, nonce_bytes) = rest.split_at(rest.len() - NONCE_LENGTH);
        let mut nonce = [0u8; NONCE_LENGTH];
        nonce.copy_from_slice(nonce_bytes);

        Ok(EncryptedPayload {
            ciphertext: ciphertext.to_vec(),
            nonce,
            key_hash,
        })
    }

    /// Concatenate a payload back into its wire form. Total for well-formed
    /// inputs; in the legacy format a missing key hash encodes as zeroes.
    pub fn encode(&self, payload: &EncryptedPayload) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(payload.ciphertext.len() + NONCE_LENGTH + self.trailer.len());
        bytes.extend_from_slice(&payload.ciphertext);
        bytes.extend_from_slice(&payload.nonce);
        if self.trailer == TrailerFormat::KeyHash {
            let hash = payload.key_hash.unwrap_or(crate::types::ZERO_KEY_HASH);
            bytes.extend_from_slice(hash.as_bytes());
        }
        bytes
    }
}

// ============================================================================
// ABI helpers
// ============================================================================

/// Extract the single dynamic `bytes` argument from ABI-encoded log data.
///
/// Layout: one 32-byte offset word, then at that offset a 32-byte length
/// word followed by the payload padded to a word boundary.
pub fn decode_abi_bytes(data: &[u8]) -> Result<Vec<u8>, ParseError> {
    if data.len() < 64 {
        return Err(ParseError::BadAbiBytes);
    }
    let offset = read_abi_word(data, 0)?;
    let len = read_abi_word(data, offset)?;
    let start = offset
        .checked_add(32)
        .ok_or(ParseError::BadAbiBytes)?;
    let end = start.checked_add(len).ok_or(ParseError::BadAbiBytes)?;
    if end > data.len() {
        return Err(ParseError::BadAbiBytes);
    }
    Ok(data[start..end].to_vec())
}

/// Inverse of [`decode_abi_bytes`]; used by tests and senders.
pub fn encode_abi_bytes(payload: &[u8]) -> Vec<u8> {
    let padded_len = payload.len().div_ceil(32) * 32;
    let mut data = Vec::with_capacity(64 + padded_len);
    data.extend_from_slice(&abi_word(32));
    data.extend_from_slice(&abi_word(payload.len()));
    data.extend_from_slice(payload);
    data.resize(64 + padded_len, 0);
    data
}

fn abi_word(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn read_abi_word(data: &[u8], at: usize) -> Result<usize, ParseError> {
    let end = at.checked_add(32).ok_or(ParseError::BadAbiBytes)?;
    if end > data.len() {
        return Err(ParseError::BadAbiBytes);
    }
    let word = &data[at..end];
    if word[..24].iter().any(|&b| b != 0) {
        return Err(ParseError::BadAbiBytes);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    let value = u64::from_be_bytes(buf);
    usize::try_from(value).map_err(|_| ParseError::BadAbiBytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZERO_KEY_HASH;

    #[test]
    fn decode_splits_nonce_from_tail() {
        let codec = PayloadCodec::default();
        let mut wire = vec![0xaa; 40]; // 28 bytes of ciphertext
        wire[28..].copy_from_slice(&[0xbb; 12]);

        let payload = codec.decode(&wire).unwrap();
        assert_eq!(payload.ciphertext, vec![0xaa; 28]);
        assert_eq!(payload.nonce, [0xbb; 12]);
        assert_eq!(payload.key_hash, None);
    }

    #[test]
    fn decode_rejects_empty_and_short_inputs() {
        let codec = PayloadCodec::default();
        assert_eq!(codec.decode(&[]), Err(ParseError::EmptyPayload));
        assert_eq!(
            codec.decode(&[0u8; 8]),
            Err(ParseError::PayloadTooShort { len: 8, min: 12 })
        );
    }

    #[test]
    fn legacy_trailer_is_split_off_when_configured() {
        let codec = PayloadCodec::new(TrailerFormat::KeyHash);
        let mut wire = Vec::new();
        wire.extend_from_slice(&[0x01; 30]); // ciphertext
        wire.extend_from_slice(&[0x02; 12]); // nonce
        wire.extend_from_slice(&[0x03; 32]); // key hash

        let payload = codec.decode(&wire).unwrap();
        assert_eq!(payload.ciphertext, vec![0x01; 30]);
        assert_eq!(payload.nonce, [0x02; 12]);
        assert_eq!(payload.key_hash, Some(KeyHash([0x03; 32])));

        // The same bytes in the canonical format keep the trailer inside
        // the ciphertext; no length-based auto-detection.
        let canonical = PayloadCodec::default().decode(&wire).unwrap();
        assert_eq!(canonical.ciphertext.len(), 30 + 12 + 32 - 12);
    }

    #[test]
    fn legacy_decode_rejects_inputs_shorter_than_trailer() {
        let codec = PayloadCodec::new(TrailerFormat::KeyHash);
        assert_eq!(
            codec.decode(&[0u8; 20]),
            Err(ParseError::PayloadTooShort { len: 20, min: 44 })
        );
    }

    #[test]
    fn encode_decode_roundtrip_both_formats() {
        for trailer in [TrailerFormat::None, TrailerFormat::KeyHash] {
            let codec = PayloadCodec::new(trailer);
            let payload = EncryptedPayload {
                ciphertext: vec![0x42; 48],
                nonce: [0x07; 12],
                key_hash: match trailer {
                    TrailerFormat::None => None,
                    TrailerFormat::KeyHash => Some(ZERO_KEY_HASH),
                },
            };
            let wire = codec.encode(&payload);
            assert_eq!(codec.decode(&wire).unwrap(), payload);
        }
    }

    #[test]
    fn abi_bytes_roundtrip() {
        for len in [0usize, 1, 31, 32, 33, 64, 100] {
            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let data = encode_abi_bytes(&payload);
            assert_eq!(data.len() % 32, 0);
            assert_eq!(decode_abi_bytes(&data).unwrap(), payload);
        }
    }

    #[test]
    fn abi_decode_rejects_truncated_data() {
        assert_eq!(decode_abi_bytes(&[]), Err(ParseError::BadAbiBytes));
        assert_eq!(decode_abi_bytes(&[0u8; 32]), Err(ParseError::BadAbiBytes));

        // Length word claims more bytes than present.
        let mut data = encode_abi_bytes(&[0xff; 40]);
        data.truncate(64 + 32);
        assert_eq!(decode_abi_bytes(&data), Err(ParseError::BadAbiBytes));
    }
}
