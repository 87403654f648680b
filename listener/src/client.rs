//! Capabilities required from the surrounding blockchain client
//!
//! The transport itself (RPC plumbing, signing, shielded calldata) is not
//! implemented here. Everything the listener needs is expressed as one
//! trait so a session carries an explicit client value instead of a
//! process-wide binding, and tests can substitute a mock.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::types::{Address, AesKey, EventKind, KeyHash, TxHash};

/// A raw contract log as the transport delivers it.
///
/// `topics[0]` is the event signature; `topics[1..]` are the indexed
/// arguments. `data` carries the ABI-encoded non-indexed arguments (for
/// token events, the single dynamic `bytes encryptedAmount`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// Indexed-field filter for a log subscription. `None` entries match any
/// value in that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub event: EventKind,
    /// First indexed argument (`from` / `owner`).
    pub party_a: Option<Address>,
    /// Second indexed argument (`to` / `spender`).
    pub party_b: Option<Address>,
    /// Third indexed argument: the correlation tag.
    pub key_hash: Option<KeyHash>,
}

impl LogFilter {
    /// Filter on an event kind alone, every other position wildcarded.
    pub fn for_event(address: Address, event: EventKind) -> Self {
        Self {
            address,
            event,
            party_a: None,
            party_b: None,
            key_hash: None,
        }
    }

    /// Whether a log's indexed fields satisfy this filter. Transports that
    /// filter server-side will already have applied this; the mock uses it
    /// directly.
    pub fn matches(&self, log: &Log) -> bool {
        if log.address != self.address || log.topics.len() != 4 {
            return false;
        }
        if log.topics[0] != self.event.signature_topic() {
            return false;
        }
        if let Some(a) = self.party_a {
            if log.topics[1] != a.to_topic() {
                return false;
            }
        }
        if let Some(b) = self.party_b {
            if log.topics[2] != b.to_topic() {
                return false;
            }
        }
        if let Some(hash) = self.key_hash {
            if log.topics[3] != hash.0 {
                return false;
            }
        }
        true
    }
}

/// Batched, push-driven delivery of subscribed logs.
pub type LogStream = mpsc::Receiver<Vec<Log>>;

/// Chain capabilities the listener consumes.
///
/// Reads against the directory are plain views; the balance read is an
/// identity-authenticated ("signed") read scoped to the caller; `setKey`
/// submission carries the key as shielded calldata.
#[async_trait]
pub trait ShieldedClient: Send + Sync {
    /// The address whose identity backs signed reads and submissions.
    fn sender_address(&self) -> Address;

    /// `Directory.checkHasKey(addr)`.
    async fn check_has_key(&self, directory: Address, addr: Address)
        -> Result<bool, ClientError>;

    /// `Directory.keyHash(addr)`.
    async fn key_hash_of(&self, directory: Address, addr: Address)
        -> Result<KeyHash, ClientError>;

    /// Submit `Directory.setKey(key)` and return the transaction hash.
    /// Submission only; confirmation is awaited separately.
    async fn submit_set_key(&self, directory: Address, key: &AesKey)
        -> Result<TxHash, ClientError>;

    /// Await the mined confirmation of a submitted transaction.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<(), ClientError>;

    /// Subscribe to contract logs matching the filter; batches arrive on
    /// the returned stream until the transport drops it.
    async fn subscribe_logs(&self, filter: LogFilter) -> Result<LogStream, ClientError>;

    /// Signed read of the caller's own confidential balance.
    async fn signed_balance_of(&self, token: Address) -> Result<u128, ClientError>;
}
