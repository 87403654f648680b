//! Core data model for confidential token events
//!
//! Events arrive as raw logs; the dispatcher validates them into a tagged
//! `TokenEvent` per kind at the subscription boundary, and hands decoded
//! outcomes to handlers as `DecodedRecord` values.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::ParseError;

/// AES-GCM nonce length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes (appended to the ciphertext).
pub const TAG_LENGTH: usize = 16;

/// Length of a Keccak-256 correlation tag in bytes.
pub const KEY_HASH_LENGTH: usize = 32;

/// Reserved correlation tag meaning "payload omitted, no key available".
pub const ZERO_KEY_HASH: KeyHash = KeyHash([0u8; KEY_HASH_LENGTH]);

// ============================================================================
// Addresses and hashes
// ============================================================================

/// A 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Read an address out of a 32-byte indexed topic (left-padded).
    pub fn from_topic(topic: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&topic[12..]);
        Address(bytes)
    }

    /// Left-pad to a 32-byte topic word.
    pub fn to_topic(&self) -> [u8; 32] {
        let mut topic = [0u8; 32];
        topic[12..].copy_from_slice(&self.0);
        topic
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Public correlation tag: Keccak-256 of an AES key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHash(pub [u8; KEY_HASH_LENGTH]);

impl KeyHash {
    pub fn as_bytes(&self) -> &[u8; KEY_HASH_LENGTH] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == ZERO_KEY_HASH
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for KeyHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Transaction hash returned by a contract submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ============================================================================
// AES key material
// ============================================================================

/// A 32-byte AES-256 key, zeroized on drop.
///
/// Held only by parties entitled to decrypt; never transmitted by this
/// crate except inside `setKey` registration. Clone is intentionally not
/// derived so copies of key material stay explicit.
pub struct AesKey {
    bytes: [u8; 32],
}

impl AesKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Derive the public correlation tag for this key.
    ///
    /// Same hash function as the directory contract, so locally and
    /// on-chain computed tags are comparable.
    pub fn key_hash(&self) -> KeyHash {
        KeyHash(Keccak256::digest(self.bytes).into())
    }
}

impl Drop for AesKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl PartialEq for AesKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl Eq for AesKey {}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesKey").finish_non_exhaustive()
    }
}

// ============================================================================
// Events
// ============================================================================

/// Event kinds consumed from the token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transfer,
    Approval,
}

impl EventKind {
    /// Canonical Solidity event signature.
    pub fn signature(&self) -> &'static str {
        match self {
            EventKind::Transfer => "Transfer(address,address,bytes32,bytes)",
            EventKind::Approval => "Approval(address,address,bytes32,bytes)",
        }
    }

    /// Topic 0 for this event: Keccak-256 of the canonical signature.
    pub fn signature_topic(&self) -> [u8; 32] {
        Keccak256::digest(self.signature().as_bytes()).into()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Transfer => write!(f, "Transfer"),
            EventKind::Approval => write!(f, "Approval"),
        }
    }
}

/// A token event validated at the subscription boundary.
///
/// `encrypted_amount` is the raw wire payload; empty means the sender
/// published no ciphertext (counterpart had no key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    Transfer {
        from: Address,
        to: Address,
        key_hash: KeyHash,
        encrypted_amount: Vec<u8>,
    },
    Approval {
        owner: Address,
        spender: Address,
        key_hash: KeyHash,
        encrypted_amount: Vec<u8>,
    },
}

impl TokenEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TokenEvent::Transfer { .. } => EventKind::Transfer,
            TokenEvent::Approval { .. } => EventKind::Approval,
        }
    }

    pub fn key_hash(&self) -> KeyHash {
        match self {
            TokenEvent::Transfer { key_hash, .. } | TokenEvent::Approval { key_hash, .. } => {
                *key_hash
            }
        }
    }

    pub fn encrypted_amount(&self) -> &[u8] {
        match self {
            TokenEvent::Transfer {
                encrypted_amount, ..
            }
            | TokenEvent::Approval {
                encrypted_amount, ..
            } => encrypted_amount,
        }
    }

    /// The indexed counterparties, verbatim from the log.
    pub fn parties(&self) -> Parties {
        match self {
            TokenEvent::Transfer { from, to, .. } => Parties::Transfer {
                from: *from,
                to: *to,
            },
            TokenEvent::Approval { owner, spender, .. } => Parties::Approval {
                owner: *owner,
                spender: *spender,
            },
        }
    }
}

/// Indexed counterparties of a decoded record; shape varies by event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum Parties {
    Transfer { from: Address, to: Address },
    Approval { owner: Address, spender: Address },
}

/// Outcome of processing a single log. Exactly one variant per log;
/// `amount` is only populated on successful decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedRecord {
    /// Payload authenticated and decrypted with the held key.
    Decrypted { amount: u128, parties: Parties },
    /// Zero-sentinel tag or no key configured for this session. Expected
    /// steady state, not an error.
    NoKey { parties: Parties },
    /// Payload present but undecodable: malformed bytes, wrong key, or
    /// corrupted ciphertext.
    DecryptionFailed { parties: Parties },
}

impl DecodedRecord {
    pub fn parties(&self) -> Parties {
        match self {
            DecodedRecord::Decrypted { parties, .. }
            | DecodedRecord::NoKey { parties }
            | DecodedRecord::DecryptionFailed { parties } => *parties,
        }
    }

    pub fn amount(&self) -> Option<u128> {
        match self {
            DecodedRecord::Decrypted { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DecodedRecord", 3)?;
        let (outcome, amount) = match self {
            DecodedRecord::Decrypted { amount, .. } => ("decrypted", Some(*amount)),
            DecodedRecord::NoKey { .. } => ("no_key", None),
            DecodedRecord::DecryptionFailed { .. } => ("decryption_failed", None),
        };
        state.serialize_field("outcome", outcome)?;
        state.serialize_field("amount", &amount)?;
        state.serialize_field("parties", &self.parties())?;
        state.end()
    }
}

// ============================================================================
// Amount parsing
// ============================================================================

/// Interpret decrypted plaintext as a big-endian unsigned integer.
///
/// The contract encrypts amounts as 32-byte words; anything beyond 128 bits
/// is rejected rather than truncated.
pub fn amount_from_be_bytes(plaintext: &[u8]) -> Result<u128, ParseError> {
    let bytes = if plaintext.len() > 16 {
        let (high, low) = plaintext.split_at(plaintext.len() - 16);
        if high.iter().any(|&b| b != 0) {
            return Err(ParseError::AmountOverflow);
        }
        low
    } else {
        plaintext
    };

    let mut amount: u128 = 0;
    for &b in bytes {
        amount = (amount << 8) | u128::from(b);
    }
    Ok(amount)
}
