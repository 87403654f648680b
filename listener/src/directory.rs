//! Client for the on-chain key directory
//!
//! The directory maps an address to the Keccak-256 hash of its AES key and,
//! for the owner only, the cleartext key. Entries are created by `setKey`
//! and never deleted.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::client::ShieldedClient;
use crate::error::ListenerError;
use crate::types::{Address, AesKey, KeyHash, TxHash};

pub use crate::crypto::compute_key_hash;

/// Bound on the submit-and-confirm sequence of a key registration.
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Read and registration operations against one directory contract.
pub struct Directory<C> {
    client: Arc<C>,
    address: Address,
}

impl<C: ShieldedClient> Directory<C> {
    pub fn new(client: Arc<C>, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Whether `addr` has a key on file (`checkHasKey`).
    pub async fn check_registration(&self, addr: Address) -> Result<bool, ListenerError> {
        let registered = self.client.check_has_key(self.address, addr).await?;
        debug!(%addr, registered, "directory registration check");
        Ok(registered)
    }

    /// The correlation tag on file for `addr` (`keyHash`); readable without
    /// holding the key itself.
    pub async fn get_key_hash(&self, addr: Address) -> Result<KeyHash, ListenerError> {
        Ok(self.client.key_hash_of(self.address, addr).await?)
    }

    /// Register the caller's key with the default 30-second bound.
    pub async fn register_key(&self, key: &AesKey) -> Result<TxHash, ListenerError> {
        self.register_key_with_timeout(key, REGISTRATION_TIMEOUT)
            .await
    }

    /// Submit `setKey` and wait for mined confirmation, the whole sequence
    /// under one bound. Exactly one submission per call: retrying a
    /// state-changing submission without idempotency guarantees could
    /// double-register, so the retry decision is left to the caller.
    pub async fn register_key_with_timeout(
        &self,
        key: &AesKey,
        bound: Duration,
    ) -> Result<TxHash, ListenerError> {
        let submit_and_confirm = async {
            let tx = self.client.submit_set_key(self.address, key).await?;
            debug!(%tx, "setKey submitted, awaiting receipt");
            self.client.wait_for_receipt(tx).await?;
            Ok::<TxHash, ListenerError>(tx)
        };

        match tokio::time::timeout(bound, submit_and_confirm).await {
            Ok(result) => {
                let tx = result?;
                info!(%tx, key_hash = %key.key_hash(), "key registered");
                Ok(tx)
            }
            Err(_) => Err(ListenerError::RegistrationTimeout(bound)),
        }
    }
}

impl<C> Clone for Directory<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            address: self.address,
        }
    }
}
