//! Environment-driven session configuration
//!
//! The surrounding process decides where values come from; this module only
//! parses the conventional environment variables. Key material is parsed
//! into [`AesKey`] and never logged or re-serialized.

use std::env;
use std::time::Duration;

use serde::Serialize;

use crate::balance::DEFAULT_POLL_INTERVAL;
use crate::error::ConfigError;
use crate::types::{Address, AesKey};

const TOKEN_ADDRESS_VAR: &str = "SHROUD_TOKEN_ADDRESS";
const DIRECTORY_ADDRESS_VAR: &str = "SHROUD_DIRECTORY_ADDRESS";
const AES_KEY_VAR: &str = "SHROUD_AES_KEY";
const MODE_VAR: &str = "SHROUD_MODE";
const POLL_INTERVAL_VAR: &str = "SHROUD_POLL_INTERVAL_SECS";

/// Which filtering mode the session runs in; the recipient address comes
/// from the client's identity, so only the discriminant is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfiguredMode {
    Auditor,
    Recipient,
}

/// Listener session settings.
#[derive(Debug, Serialize)]
pub struct SessionConfig {
    pub token_address: Address,
    pub directory_address: Address,
    #[serde(skip)]
    pub aes_key: Option<AesKey>,
    pub mode: ConfiguredMode,
    #[serde(with = "secs")]
    pub poll_interval: Duration,
}

impl SessionConfig {
    /// Read the session configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_address = parse_address(TOKEN_ADDRESS_VAR, &require_var(TOKEN_ADDRESS_VAR)?)?;
        let directory_address =
            parse_address(DIRECTORY_ADDRESS_VAR, &require_var(DIRECTORY_ADDRESS_VAR)?)?;

        let aes_key = match optional_var(AES_KEY_VAR) {
            Some(raw) => Some(parse_aes_key(AES_KEY_VAR, &raw)?),
            None => None,
        };

        let mode = match require_var(MODE_VAR)?.to_ascii_lowercase().as_str() {
            "auditor" | "intelligence" => ConfiguredMode::Auditor,
            "recipient" => ConfiguredMode::Recipient,
            other => return Err(ConfigError::UnknownMode(other.to_string())),
        };

        let poll_interval = match optional_var(POLL_INTERVAL_VAR) {
            Some(raw) => parse_poll_interval(POLL_INTERVAL_VAR, &raw)?,
            None => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            token_address,
            directory_address,
            aes_key,
            mode,
            poll_interval,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn optional_var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn decode_hex(name: &'static str, raw: &str) -> Result<Vec<u8>, ConfigError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped).map_err(|source| ConfigError::InvalidHex { name, source })
}

/// Parse a 20-byte address from `0x`-prefixed or bare hex.
pub fn parse_address(name: &'static str, raw: &str) -> Result<Address, ConfigError> {
    let bytes = decode_hex(name, raw)?;
    let bytes: [u8; 20] = bytes.try_into().map_err(|v: Vec<u8>| ConfigError::BadLength {
        name,
        expected: 20,
        got: v.len(),
    })?;
    Ok(Address(bytes))
}

/// Parse a 32-byte AES key from `0x`-prefixed or bare hex.
pub fn parse_aes_key(name: &'static str, raw: &str) -> Result<AesKey, ConfigError> {
    let bytes = decode_hex(name, raw)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| ConfigError::BadLength {
        name,
        expected: 32,
        got: v.len(),
    })?;
    Ok(AesKey::from_bytes(bytes))
}

/// Parse a positive poll interval in whole seconds. Zero is rejected: the
/// poller's timer requires a non-zero period.
fn parse_poll_interval(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        detail: format!("{raw:?} is not a number of seconds"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            name,
            detail: "poll interval must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

mod secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_secs())
    }
}
