//! Periodic signed reads of the caller's own confidential balance
//!
//! Confidential balances are not public state: the read carries the
//! caller's signature and returns only their own balance. The poller does
//! one immediate read, then one read per tick; a failed read is logged and
//! the loop continues.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::ShieldedClient;
use crate::types::Address;

/// Default polling cadence, matching the listener sessions it runs beside.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Callback receiving each successfully read balance.
pub type BalanceHandler = Arc<dyn Fn(u128) + Send + Sync>;

/// Handle to a running balance poller; dropping it does not stop the loop,
/// shutdown is explicit.
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the polling loop to exit.
    pub async fn closed(self) {
        let _ = self.task.await;
    }
}

/// Spawn a poller doing one signed balance read per tick.
pub fn spawn_balance_poller<C>(
    client: Arc<C>,
    token: Address,
    interval: Duration,
    on_balance: BalanceHandler,
) -> PollerHandle
where
    C: ShieldedClient + 'static,
{
    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        let owner = client.sender_address();
        // The timer panics on a zero period, which would silently kill this
        // task; fall back to the default cadence instead.
        let period = if interval.is_zero() {
            warn!(?interval, "zero poll interval requested, using default");
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        let mut ticker = tokio::time::interval(period);
        // A delayed tick must not cause a burst of reads afterwards.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = loop_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match client.signed_balance_of(token).await {
                        Ok(balance) => {
                            info!(%token, %owner, balance, "signed balance read");
                            on_balance(balance);
                        }
                        // Polling is never aborted by a single failed read.
                        Err(err) => warn!(%token, %owner, %err, "balance read failed"),
                    }
                }
            }
        }
    });

    PollerHandle { cancel, task }
}
