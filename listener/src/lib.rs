//! # shroud-listener
//!
//! Event listener for confidential SRC20-style tokens. Transfer and
//! approval amounts are published on-chain only as AES-256-GCM ciphertext;
//! observers holding the matching 32-byte key recover the amount, everyone
//! else learns nothing.
//!
//! The crate covers four concerns:
//!
//! - **Payload codec** ([`payload`]): the `ciphertext ‖ nonce` wire format,
//!   including the legacy key-hash trailer variant.
//! - **Decryption engine** ([`crypto`]): authenticated AES-256-GCM with a
//!   hard failure on tag mismatch.
//! - **Key directory** ([`directory`]): publishing and querying the public
//!   Keccak-256 correlation tag of a key, with bounded-wait registration.
//! - **Event dispatcher** ([`dispatcher`]): long-lived log subscriptions
//!   that classify every event into `Decrypted`, `NoKey`, or
//!   `DecryptionFailed` without ever dying on a bad log.
//!
//! A [`balance`] poller additionally reads the caller's own confidential
//! balance through identity-authenticated ("signed") reads.
//!
//! The blockchain transport itself is not implemented here: sessions are
//! built over any [`client::ShieldedClient`] implementation.

pub mod balance;
pub mod client;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod types;


#[cfg(test)]
mod fuzz_tests;

#[cfg(test)]
mod test_vectors;

pub use balance::{spawn_balance_poller, BalanceHandler, PollerHandle, DEFAULT_POLL_INTERVAL};
pub use client::{Log, LogFilter, LogStream, ShieldedClient};
pub use config::{ConfiguredMode, SessionConfig};
pub use crypto::{compute_key_hash, random_nonce, EventCipher};
pub use directory::{Directory, REGISTRATION_TIMEOUT};
pub use dispatcher::{
    Dispatcher, ErrorHandler, EventHandlers, ListenerMode, RecordHandler, SubscriptionHandle,
};
pub use error::{ClientError, ConfigError, ListenerError, ParseError};
pub use payload::{decode_abi_bytes, encode_abi_bytes, EncryptedPayload, PayloadCodec, TrailerFormat};
pub use types::{
    amount_from_be_bytes, Address, AesKey, DecodedRecord, EventKind, KeyHash, Parties, TokenEvent,
    TxHash, KEY_HASH_LENGTH, NONCE_LENGTH, TAG_LENGTH, ZERO_KEY_HASH,
};
