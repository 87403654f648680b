//! Event dispatcher: subscription, filtering, and per-log decoding
//!
//! A dispatcher session holds an immutable key (if any) and attaches one
//! log subscription per event kind. Every delivered log is classified into
//! exactly one `DecodedRecord` variant and pushed to the handler for its
//! kind. Per-log failures are contained: a bad log produces a
//! `DecryptionFailed` record plus an error notification, never a dead
//! subscription.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{Log, LogFilter, ShieldedClient};
use crate::crypto::EventCipher;
use crate::error::{ClientError, ListenerError, ParseError};
use crate::payload::{decode_abi_bytes, PayloadCodec};
use crate::types::{
    Address, AesKey, DecodedRecord, EventKind, KeyHash, TokenEvent, ZERO_KEY_HASH,
};

/// How a session filters the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerMode {
    /// Intelligence-provider view: every event whose publisher used the
    /// given correlation tag, regardless of counterpart address.
    Auditor { key_hash: KeyHash },
    /// Recipient view: events where the given address is the counterpart
    /// (`to` / `spender`), tagged with the session key's hash, or with the
    /// zero sentinel when no key is held.
    Recipient { address: Address },
}

/// Handler invoked with each decoded record. Errors are isolated per log
/// and surfaced to the error handler.
pub type RecordHandler =
    Arc<dyn Fn(DecodedRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Sink for per-log errors and subscription-level notices.
pub type ErrorHandler = Arc<dyn Fn(ListenerError) + Send + Sync>;

/// One handler per event kind, plus the error sink.
#[derive(Clone)]
pub struct EventHandlers {
    pub on_transfer: RecordHandler,
    pub on_approval: RecordHandler,
    pub on_error: ErrorHandler,
}

impl EventHandlers {
    fn for_kind(&self, kind: EventKind) -> &RecordHandler {
        match kind {
            EventKind::Transfer => &self.on_transfer,
            EventKind::Approval => &self.on_approval,
        }
    }
}

/// Key material fixed for the lifetime of a session.
struct SessionKey {
    cipher: EventCipher,
    key_hash: KeyHash,
}

/// A listener session over one token contract.
///
/// All state is set at construction and immutable afterwards, so logs can
/// be processed concurrently without locking.
pub struct Dispatcher<C> {
    client: Arc<C>,
    token: Address,
    codec: PayloadCodec,
    mode: ListenerMode,
    session: Option<Arc<SessionKey>>,
}

impl<C: ShieldedClient + 'static> Dispatcher<C> {
    /// Build a session. `key` is optional: a recipient without a
    /// registered key still sees its events, classified as `NoKey`.
    pub fn new(
        client: Arc<C>,
        token: Address,
        codec: PayloadCodec,
        mode: ListenerMode,
        key: Option<AesKey>,
    ) -> Self {
        let session = key.map(|key| {
            Arc::new(SessionKey {
                cipher: EventCipher::new(&key),
                key_hash: key.key_hash(),
            })
        });
        Self {
            client,
            token,
            codec,
            mode,
            session,
        }
    }

    /// The correlation tag this session subscribes under.
    pub fn subscription_tag(&self) -> KeyHash {
        match self.mode {
            ListenerMode::Auditor { key_hash } => key_hash,
            ListenerMode::Recipient { .. } => self
                .session
                .as_ref()
                .map(|s| s.key_hash)
                .unwrap_or(ZERO_KEY_HASH),
        }
    }

    fn filter_for(&self, event: EventKind) -> LogFilter {
        let mut filter = LogFilter::for_event(self.token, event);
        match self.mode {
            ListenerMode::Auditor { key_hash } => {
                filter.key_hash = Some(key_hash);
            }
            ListenerMode::Recipient { address } => {
                // The recipient is the second indexed argument for both
                // kinds: `to` on Transfer, `spender` on Approval.
                filter.party_b = Some(address);
                filter.key_hash = Some(self.subscription_tag());
            }
        }
        filter
    }

    /// Attach one log subscription per event kind and start dispatching.
    ///
    /// Runs until [`SubscriptionHandle::shutdown`] is called or the
    /// transport closes the stream; a closed stream is reported through
    /// `on_error` and ends only that kind's watcher.
    pub async fn subscribe(
        &self,
        handlers: EventHandlers,
    ) -> Result<SubscriptionHandle, ListenerError> {
        // Open every stream before spawning anything: a failed second
        // subscription must not leave a live watcher with no handle to
        // stop it.
        let mut streams = Vec::with_capacity(2);
        for kind in [EventKind::Transfer, EventKind::Approval] {
            let stream = self.client.subscribe_logs(self.filter_for(kind)).await?;
            debug!(%kind, token = %self.token, tag = %self.subscription_tag(), "subscribed");
            streams.push((kind, stream));
        }

        let cancel = CancellationToken::new();
        let mut watchers = Vec::with_capacity(streams.len());

        for (kind, mut stream) in streams {
            let ctx = Arc::new(LogContext {
                kind,
                codec: self.codec,
                session: self.session.clone(),
                handlers: handlers.clone(),
            });
            let watcher_cancel = cancel.child_token();

            watchers.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = watcher_cancel.cancelled() => break,
                        batch = stream.recv() => match batch {
                            Some(logs) => {
                                // Each log is an independent unit of work:
                                // no ordering guarantee, and a slow handler
                                // for one log does not block the others.
                                for log in logs {
                                    let ctx = Arc::clone(&ctx);
                                    tokio::spawn(async move { process_log(&ctx, log) });
                                }
                            }
                            None => {
                                (ctx.handlers.on_error)(ClientError::SubscriptionClosed.into());
                                break;
                            }
                        },
                    }
                }
            }));
        }

        Ok(SubscriptionHandle {
            cancel,
            watchers,
        })
    }
}

/// Handle to a running subscription. The underlying protocol has no
/// unsubscribe; shutdown cancels the local watchers.
pub struct SubscriptionHandle {
    cancel: CancellationToken,
    watchers: Vec<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Stop both watchers. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the watcher tasks to exit.
    pub async fn closed(self) {
        for watcher in self.watchers {
            let _ = watcher.await;
        }
    }
}

/// Immutable per-subscription context shared by concurrently processed logs.
struct LogContext {
    kind: EventKind,
    codec: PayloadCodec,
    session: Option<Arc<SessionKey>>,
    handlers: EventHandlers,
}

/// Validate, classify, and deliver a single log. Never panics outward and
/// never returns an error: every failure path ends in a handler or
/// `on_error` call.
fn process_log(ctx: &LogContext, log: Log) {
    // Boundary validation first: without well-formed indexed fields there
    // are no parties to attribute a record to, so malformed logs surface
    // through the error sink alone.
    let event = match parse_token_event(ctx.kind, &log) {
        Ok(event) => event,
        Err(err) => {
            warn!(kind = %ctx.kind, %err, "dropping malformed log");
            (ctx.handlers.on_error)(err.into());
            return;
        }
    };

    let (record, failure) = classify(ctx, &event);
    if let Some(err) = failure {
        debug!(kind = %ctx.kind, %err, "payload undecodable, downgrading");
        (ctx.handlers.on_error)(err);
    }

    if let Err(err) = (ctx.handlers.for_kind(ctx.kind))(record) {
        (ctx.handlers.on_error)(ListenerError::Handler(err.to_string()));
    }
}

/// Validate a raw log into a tagged event for the expected kind.
fn parse_token_event(kind: EventKind, log: &Log) -> Result<TokenEvent, ParseError> {
    if log.topics.len() != 4 {
        return Err(ParseError::BadLog("expected 4 topics"));
    }
    if log.topics[0] != kind.signature_topic() {
        return Err(ParseError::BadLog("event signature mismatch"));
    }

    let party_a = Address::from_topic(&log.topics[1]);
    let party_b = Address::from_topic(&log.topics[2]);
    let key_hash = KeyHash(log.topics[3]);
    let encrypted_amount = decode_abi_bytes(&log.data)?;

    Ok(match kind {
        EventKind::Transfer => TokenEvent::Transfer {
            from: party_a,
            to: party_b,
            key_hash,
            encrypted_amount,
        },
        EventKind::Approval => TokenEvent::Approval {
            owner: party_a,
            spender: party_b,
            key_hash,
            encrypted_amount,
        },
    })
}

/// Classify one event into its record, returning the underlying error when
/// the outcome is a downgrade.
fn classify(ctx: &LogContext, event: &TokenEvent) -> (DecodedRecord, Option<ListenerError>) {
    let parties = event.parties();

    // Zero sentinel means the publisher had no key to encrypt to; no local
    // key means nothing to decrypt with. Either way, no decode is attempted
    // (the payload may be absent or garbage by design).
    let session = match &ctx.session {
        Some(session) if !event.key_hash().is_zero() => session,
        _ => return (DecodedRecord::NoKey { parties }, None),
    };

    match decrypt_amount(ctx, session, event) {
        Ok(amount) => (DecodedRecord::Decrypted { amount, parties }, None),
        Err(err) => (DecodedRecord::DecryptionFailed { parties }, Some(err)),
    }
}

fn decrypt_amount(
    ctx: &LogContext,
    session: &SessionKey,
    event: &TokenEvent,
) -> Result<u128, ListenerError> {
    let payload = ctx.codec.decode(event.encrypted_amount())?;

    // Legacy trailer: the embedded hash exists to catch a mismatched key
    // before decryption; disagreement with the indexed tag is a failure.
    if let Some(embedded) = payload.key_hash {
        if embedded != event.key_hash() {
            return Err(ParseError::TrailerMismatch.into());
        }
    }

    let plaintext = session.cipher.decrypt(&payload.nonce, &payload.ciphertext)?;
    Ok(crate::types::amount_from_be_bytes(&plaintext)?)
}
