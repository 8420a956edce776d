//! The system routing loop.
//!
//! A single long-lived task subscribes to the bus once at startup and
//! forwards every published envelope into the recipient's mailbox, resolved
//! through the registry. Delivery failures never crash the router: unknown
//! recipients and closed mailboxes are logged, counted, and recorded as bus
//! events, then the loop moves on (drop-with-log dead-letter policy).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use kestrel_api::message::Message;
use kestrel_api::monitor::Monitor;

use super::broker::BusSubscription;
use super::registry::ActorRegistry;
use crate::monitor::events::{BusEvent, BusEventKind};
use crate::system::SystemState;

/// Delivery counters kept by the router, shared with the owning system.
#[derive(Debug, Default)]
pub struct RouterStats {
    pub delivered: AtomicU64,
    pub unroutable: AtomicU64,
    pub mailbox_closed: AtomicU64,
    pub expired: AtomicU64,
}

impl RouterStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn unroutable(&self) -> u64 {
        self.unroutable.load(Ordering::Relaxed)
    }

    pub fn mailbox_closed(&self) -> u64 {
        self.mailbox_closed.load(Ordering::Relaxed)
    }

    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }
}

pub(crate) struct Router<M, MO>
where
    M: Message,
    MO: Monitor<BusEvent>,
{
    subscription: BusSubscription<M>,
    registry: ActorRegistry<M>,
    state: Arc<RwLock<SystemState>>,
    stats: Arc<RouterStats>,
    monitor: MO,
}

impl<M, MO> Router<M, MO>
where
    M: Message,
    MO: Monitor<BusEvent>,
{
    pub(crate) fn new(
        subscription: BusSubscription<M>,
        registry: ActorRegistry<M>,
        state: Arc<RwLock<SystemState>>,
        stats: Arc<RouterStats>,
        monitor: MO,
    ) -> Self {
        Self {
            subscription,
            registry,
            state,
            stats,
            monitor,
        }
    }

    /// Runs until the bus closes or the system leaves the running state.
    ///
    /// In-flight deliveries complete; the loop only stops taking new
    /// envelopes once shutdown begins.
    pub(crate) async fn run(mut self) {
        while let Some(envelope) = self.subscription.recv().await {
            if *self.state.read() != SystemState::Running {
                debug!("system shutting down, router stops taking new envelopes");
                break;
            }

            if envelope.is_expired() {
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                let address = envelope.recipient.as_ref().map(ToString::to_string);
                debug!(message_type = M::MESSAGE_TYPE, "dropping expired envelope");
                self.monitor
                    .record(BusEvent::now(BusEventKind::Expired, address));
                continue;
            }

            // The bus rejects recipient-less envelopes at publish time, so
            // anything arriving here without one is skipped the same way an
            // unknown address is.
            let Some(recipient) = envelope.recipient.clone() else {
                self.stats.unroutable.fetch_add(1, Ordering::Relaxed);
                warn!(
                    message_type = M::MESSAGE_TYPE,
                    "envelope without recipient reached the router"
                );
                self.monitor
                    .record(BusEvent::now(BusEventKind::UnknownRecipient, None));
                continue;
            };

            let sender = match self.registry.resolve(&recipient) {
                Ok(sender) => sender,
                Err(_) => {
                    self.stats.unroutable.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        recipient = %recipient,
                        message_type = M::MESSAGE_TYPE,
                        "no registered actor for recipient, dropping envelope"
                    );
                    self.monitor.record(BusEvent::now(
                        BusEventKind::UnknownRecipient,
                        Some(recipient.to_string()),
                    ));
                    continue;
                }
            };

            match sender.send(envelope).await {
                Ok(()) => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    trace!(recipient = %recipient, "envelope delivered");
                    self.monitor.record(BusEvent::now(
                        BusEventKind::Delivered,
                        Some(recipient.to_string()),
                    ));
                }
                Err(err) => {
                    self.stats.mailbox_closed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        recipient = %recipient,
                        error = %err,
                        "mailbox rejected envelope, dropping"
                    );
                    self.monitor.record(BusEvent::now(
                        BusEventKind::MailboxClosed,
                        Some(recipient.to_string()),
                    ));
                }
            }
        }
    }
}
