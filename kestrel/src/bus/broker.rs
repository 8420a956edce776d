//! Publish/subscribe message bus with request-reply correlation.
//!
//! The bus is transport only: it fans published envelopes out to every
//! subscriber stream and correlates replies to pending requests, but it does
//! not know how to reach a specific actor. Routing to mailboxes is the
//! router's job (one of the subscribers).
//!
//! Replies travel through a type-tagged opaque box (`Box<dyn Any + Send>`).
//! The requester verifies the concrete envelope type when unboxing and fails
//! with [`BusError::ReplyTypeMismatch`] instead of reinterpreting memory or
//! taking a serialization detour.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use kestrel_api::message::{Message, MessageEnvelope};

use super::error::BusError;

/// Type-erased reply payload. The concrete type behind the box is always a
/// `MessageEnvelope<R>` for the responder's reply type `R`.
type ReplyBox = Box<dyn Any + Send>;

/// A request waiting for its reply.
///
/// Exactly one of two things removes the entry: a matching reply, or the
/// request's deadline elapsing. Resolving an already-removed entry is a
/// no-op, never an error.
struct PendingRequest {
    reply_tx: oneshot::Sender<ReplyBox>,
    created_at: Instant,
    deadline: Instant,
}

/// One subscriber's view of the published envelope stream.
pub struct BusSubscription<M: Message> {
    rx: flume::Receiver<MessageEnvelope<M>>,
}

impl<M: Message> BusSubscription<M> {
    /// Waits for the next published envelope. Returns `None` once the bus
    /// has been dropped.
    pub async fn recv(&mut self) -> Option<MessageEnvelope<M>> {
        self.rx.recv_async().await.ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<MessageEnvelope<M>> {
        self.rx.try_recv().ok()
    }

    /// Number of envelopes buffered for this subscriber.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// In-process publish/subscribe bus.
///
/// Clones are cheap and share subscriber and pending-request state. The bus
/// is created once at system start, handed by reference to every task that
/// needs it, and torn down at shutdown; it is never ambient global state.
pub struct MessageBus<M: Message> {
    inner: Arc<BusInner<M>>,
}

struct BusInner<M: Message> {
    /// Subscriber streams. Read-mostly: publishes take the read lock, only
    /// subscribe and pruning take the write lock.
    subscribers: RwLock<Vec<flume::Sender<MessageEnvelope<M>>>>,

    /// Pending request-reply correlation: correlation id → waiting request.
    pending: DashMap<Uuid, PendingRequest>,
}

impl<M: Message> MessageBus<M> {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(Vec::new()),
                pending: DashMap::new(),
            }),
        }
    }

    /// Registers a new independent consumer of all published envelopes.
    ///
    /// Multiple simultaneous subscribers (router, monitor, audit) each
    /// receive their own copy of every envelope published after they
    /// subscribed.
    pub fn subscribe(&self) -> BusSubscription<M> {
        let (tx, rx) = flume::unbounded();
        self.inner.subscribers.write().push(tx);
        BusSubscription { rx }
    }

    /// Broadcasts an envelope to every live subscriber.
    ///
    /// An envelope without a recipient cannot be routed by anyone and is
    /// rejected as a configuration error. A closed subscriber stream never
    /// blocks or fails delivery to the others; dead streams are pruned
    /// lazily.
    pub fn publish(&self, envelope: MessageEnvelope<M>) -> Result<(), BusError> {
        if envelope.recipient.is_none() {
            return Err(BusError::MissingRecipient {
                message_type: M::MESSAGE_TYPE,
            });
        }
        self.broadcast(envelope);
        Ok(())
    }

    fn broadcast(&self, envelope: MessageEnvelope<M>) {
        let mut saw_closed = false;
        {
            let subscribers = self.inner.subscribers.read();
            for subscriber in subscribers.iter() {
                if subscriber.send(envelope.clone()).is_err() {
                    saw_closed = true;
                }
            }
        }

        if saw_closed {
            self.inner
                .subscribers
                .write()
                .retain(|subscriber| !subscriber.is_disconnected());
        }
    }

    /// Publishes a request and waits for its reply.
    ///
    /// A correlation id is generated, a pending entry registered, the
    /// envelope published, and the reply raced against the timeout. Timing
    /// out is an expected outcome and yields `Ok(None)`; the pending entry
    /// is removed in every outcome, so late replies are discarded rather
    /// than delivered to an absent receiver.
    pub async fn publish_request<R: Message>(
        &self,
        mut envelope: MessageEnvelope<M>,
        reply_timeout: Duration,
    ) -> Result<Option<MessageEnvelope<R>>, BusError> {
        if envelope.recipient.is_none() {
            return Err(BusError::MissingRecipient {
                message_type: M::MESSAGE_TYPE,
            });
        }

        let correlation_id = Uuid::new_v4();
        envelope.correlation_id = Some(correlation_id);

        let (reply_tx, reply_rx) = oneshot::channel();
        let now = Instant::now();
        self.inner.pending.insert(
            correlation_id,
            PendingRequest {
                reply_tx,
                created_at: now,
                deadline: now + reply_timeout,
            },
        );

        if let Err(err) = self.publish(envelope) {
            self.inner.pending.remove(&correlation_id);
            return Err(err);
        }

        match timeout(reply_timeout, reply_rx).await {
            Ok(Ok(boxed)) => match boxed.downcast::<MessageEnvelope<R>>() {
                Ok(reply) => Ok(Some(*reply)),
                Err(_) => Err(BusError::ReplyTypeMismatch {
                    expected: R::MESSAGE_TYPE,
                }),
            },
            Ok(Err(_)) => {
                // Sender dropped without a reply; entry is already gone.
                self.inner.pending.remove(&correlation_id);
                Ok(None)
            }
            Err(_) => {
                self.inner.pending.remove(&correlation_id);
                debug!(%correlation_id, ?reply_timeout, "request timed out without reply");
                Ok(None)
            }
        }
    }

    /// Delivers a reply to the request identified by `correlation_id`.
    ///
    /// The reply type `R` may differ from the bus message type; the
    /// requester checks the concrete type on receipt. Replying to an
    /// unknown or already-resolved correlation id is a no-op (the request
    /// timed out first), logged at debug level.
    pub fn publish_reply<R: Message>(
        &self,
        correlation_id: Uuid,
        envelope: MessageEnvelope<R>,
    ) -> Result<(), BusError> {
        match self.inner.pending.remove(&correlation_id) {
            Some((_, request)) => {
                if Instant::now() > request.deadline {
                    debug!(
                        %correlation_id,
                        waited = ?request.created_at.elapsed(),
                        "reply arrived past its deadline"
                    );
                }
                // A lost race against the timeout also lands here: the
                // receiver is gone and the reply is discarded.
                if request.reply_tx.send(Box::new(envelope)).is_err() {
                    debug!(%correlation_id, "reply discarded, requester no longer waiting");
                }
                Ok(())
            }
            None => {
                debug!(%correlation_id, "late reply for unknown correlation id, discarding");
                Ok(())
            }
        }
    }

    /// Number of requests currently awaiting replies.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    /// Number of live subscriber streams.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl<M: Message> Default for MessageBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Clone for MessageBus<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
