//! Error taxonomy for the confidential event listener
//!
//! Per-log failures (parse, authentication) are downgraded to
//! `DecryptionFailed` records inside the dispatcher; only key registration
//! surfaces a hard rejection to the caller.

use std::time::Duration;

use thiserror::Error;

use crate::types::TAG_LENGTH;

/// Malformed or undersized data, local to the codec and log boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("encrypted payload is empty")]
    EmptyPayload,

    #[error("encrypted payload too short: {len} bytes, need at least {min}")]
    PayloadTooShort { len: usize, min: usize },

    #[error("ciphertext shorter than the {TAG_LENGTH}-byte authentication tag")]
    CiphertextTooShort,

    #[error("malformed ABI bytes argument in log data")]
    BadAbiBytes,

    #[error("payload-embedded key hash does not match the log's correlation tag")]
    TrailerMismatch,

    #[error("decrypted amount does not fit in 128 bits")]
    AmountOverflow,

    #[error("invalid log shape: {0}")]
    BadLog(&'static str),
}

/// Failure reported by the underlying blockchain client.
///
/// The concrete transport lives outside this crate, so the detail is carried
/// as a string rather than a transport-specific type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("log subscription closed by transport")]
    SubscriptionClosed,
}

/// Session configuration problems (environment parsing).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid hex in {name}")]
    InvalidHex {
        name: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("{name} must be {expected} bytes, got {got}")]
    BadLength {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("unknown mode {0:?}, expected \"auditor\" or \"recipient\"")]
    UnknownMode(String),

    #[error("invalid value for {name}: {detail}")]
    InvalidValue { name: &'static str, detail: String },
}

/// Top-level error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// AES-GCM tag verification failed: wrong key, corrupted or truncated
    /// ciphertext. Never a partial plaintext.
    #[error("authentication failed: ciphertext rejected by tag verification")]
    Authentication,

    /// On-chain confirmation of `setKey` was not observed within the bound.
    /// One-shot operation; retrying is the caller's decision.
    #[error("key registration not confirmed within {0:?}")]
    RegistrationTimeout(Duration),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A caller-supplied record handler returned an error. Isolated per log;
    /// the subscription stays alive.
    #[error("event handler failed: {0}")]
    Handler(String),
}

impl ListenerError {
    /// Whether this error is downgraded to a `DecryptionFailed` record at
    /// the dispatcher boundary instead of propagating.
    pub fn is_per_log(&self) -> bool {
        matches!(self, ListenerError::Parse(_) | ListenerError::Authentication)
    }
}
