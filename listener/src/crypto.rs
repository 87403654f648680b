//! Authenticated decryption of confidential transfer amounts
//!
//! The chain's AES precompile uses AES-256-GCM and appends the 16-byte
//! authentication tag to the ciphertext, which is exactly the convention of
//! the `aes-gcm` crate: no manual tag handling is needed beyond a length
//! check. Tag verification failure is a hard error; there is no partial or
//! best-effort plaintext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use crate::error::{ListenerError, ParseError};
use crate::types::{AesKey, KeyHash, NONCE_LENGTH, TAG_LENGTH};

/// Compute the public correlation tag for an AES key.
///
/// Keccak-256, matching the directory contract, so tags computed locally
/// and on-chain are comparable.
pub fn compute_key_hash(key: &AesKey) -> KeyHash {
    key.key_hash()
}

/// Generate a fresh random nonce for the sender path.
pub fn random_nonce() -> [u8; NONCE_LENGTH] {
    let mut nonce = [0u8; NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// AES-256-GCM engine bound to one key for the lifetime of a session.
///
/// Stateless given its inputs; safe to share across concurrently processed
/// logs without locking.
pub struct EventCipher {
    cipher: Aes256Gcm,
}

impl EventCipher {
    pub fn new(key: &AesKey) -> Self {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .expect("AES-256 key is always 32 bytes by construction");
        Self { cipher }
    }

    /// Authenticated decryption of a tag-appended ciphertext.
    ///
    /// Fails with `Authentication` on tag mismatch (wrong key, corrupted or
    /// truncated data) and `Parse` when the input cannot even contain a tag.
    pub fn decrypt(
        &self,
        nonce: &[u8; NONCE_LENGTH],
        ciphertext_with_tag: &[u8],
    ) -> Result<Vec<u8>, ListenerError> {
        if ciphertext_with_tag.len() < TAG_LENGTH {
            return Err(ParseError::CiphertextTooShort.into());
        }

        self.cipher
            .decrypt(&Nonce::from(*nonce), ciphertext_with_tag)
            .map_err(|_| ListenerError::Authentication)
    }

    /// Encrypt plaintext, returning ciphertext with the tag appended.
    ///
    /// The sender-side counterpart of [`EventCipher::decrypt`]; also used to
    /// build test fixtures.
    pub fn encrypt(&self, nonce: &[u8; NONCE_LENGTH], plaintext: &[u8]) -> Vec<u8> {
        self.cipher
            .encrypt(&Nonce::from(*nonce), plaintext)
            .expect("AES-GCM encryption is infallible for in-memory buffers")
    }
}

impl std::fmt::Debug for EventCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCipher").finish_non_exhaustive()
    }
}
