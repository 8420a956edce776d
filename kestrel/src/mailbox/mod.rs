//! Per-actor message queues.
//!
//! A mailbox is the only way messages reach an actor. Senders are cheap
//! clones held by the registry and the router; the receiver is owned by the
//! actor's processing loop. Delivery order within one mailbox is FIFO.
//!
//! Backpressure is a property of the sender: a full bounded mailbox can block
//! the producer, reject the send, or silently drop the newest message.

use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;

use kestrel_api::message::{Message, MessageEnvelope};

/// Errors related to mailbox operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("Mailbox is full (capacity: {capacity})")]
    Full { capacity: usize },
    #[error("Mailbox is closed")]
    Closed,
    #[error("Send timed out after {0:?}")]
    SendTimeout(Duration),
}

/// Policy applied when a bounded mailbox is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressureStrategy {
    /// Suspend the sender until space is available.
    #[default]
    Block,
    /// Fail the send with [`MailboxError::Full`].
    Reject,
    /// Drop the message being sent and report success.
    DropNewest,
}

/// Creates a bounded mailbox with the given capacity and backpressure policy.
pub fn bounded<M: Message>(
    capacity: usize,
    strategy: BackpressureStrategy,
) -> (MailboxSender<M>, MailboxReceiver<M>) {
    let (tx, rx) = flume::bounded(capacity);
    (
        MailboxSender {
            tx,
            capacity: Some(capacity),
            strategy,
        },
        MailboxReceiver { rx },
    )
}

/// Creates an unbounded mailbox. Sends never block.
pub fn unbounded<M: Message>() -> (MailboxSender<M>, MailboxReceiver<M>) {
    let (tx, rx) = flume::unbounded();
    (
        MailboxSender {
            tx,
            capacity: None,
            strategy: BackpressureStrategy::Block,
        },
        MailboxReceiver { rx },
    )
}

/// Sending half of a mailbox.
///
/// Clones share the same queue. The mailbox closes when the receiver is
/// dropped; subsequent sends fail with [`MailboxError::Closed`].
#[derive(Debug)]
pub struct MailboxSender<M: Message> {
    tx: flume::Sender<MessageEnvelope<M>>,
    capacity: Option<usize>,
    strategy: BackpressureStrategy,
}

impl<M: Message> Clone for MailboxSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
            strategy: self.strategy,
        }
    }
}

impl<M: Message> MailboxSender<M> {
    /// Delivers an envelope, applying the configured backpressure strategy.
    pub async fn send(&self, envelope: MessageEnvelope<M>) -> Result<(), MailboxError> {
        match self.strategy {
            BackpressureStrategy::Block => self
                .tx
                .send_async(envelope)
                .await
                .map_err(|_| MailboxError::Closed),
            BackpressureStrategy::Reject => match self.tx.try_send(envelope) {
                Ok(()) => Ok(()),
                Err(flume::TrySendError::Full(_)) => Err(MailboxError::Full {
                    capacity: self.capacity.unwrap_or(usize::MAX),
                }),
                Err(flume::TrySendError::Disconnected(_)) => Err(MailboxError::Closed),
            },
            BackpressureStrategy::DropNewest => match self.tx.try_send(envelope) {
                Ok(()) => Ok(()),
                // Full queue: the new message is discarded by policy.
                Err(flume::TrySendError::Full(_)) => Ok(()),
                Err(flume::TrySendError::Disconnected(_)) => Err(MailboxError::Closed),
            },
        }
    }

    /// Like [`send`](Self::send) with `Block`, but bounded by a deadline.
    pub async fn send_timeout(
        &self,
        envelope: MessageEnvelope<M>,
        deadline: Duration,
    ) -> Result<(), MailboxError> {
        match timeout(deadline, self.tx.send_async(envelope)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(MailboxError::Closed),
            Err(_) => Err(MailboxError::SendTimeout(deadline)),
        }
    }

    /// Number of queued envelopes (snapshot in time).
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// True once the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_disconnected()
    }

    /// Configured capacity, `None` for unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Receiving half of a mailbox. Owned by exactly one processing loop.
#[derive(Debug)]
pub struct MailboxReceiver<M: Message> {
    rx: flume::Receiver<MessageEnvelope<M>>,
}

impl<M: Message> MailboxReceiver<M> {
    /// Waits for the next envelope.
    ///
    /// Returns `None` once every sender has been dropped and the queue is
    /// drained, which is the mailbox-closed signal for the processing loop.
    pub async fn recv(&mut self) -> Option<MessageEnvelope<M>> {
        self.rx.recv_async().await.ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<MessageEnvelope<M>> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note(&'static str);

    impl Message for Note {
        const MESSAGE_TYPE: &'static str = "note";
    }

    #[tokio::test]
    async fn send_and_recv_preserve_fifo_order() {
        let (tx, mut rx) = bounded::<Note>(8, BackpressureStrategy::Block);

        for text in ["one", "two", "three"] {
            tx.send(MessageEnvelope::new(Note(text))).await.unwrap();
        }

        assert_eq!(rx.recv().await.unwrap().payload, Note("one"));
        assert_eq!(rx.recv().await.unwrap().payload, Note("two"));
        assert_eq!(rx.recv().await.unwrap().payload, Note("three"));
    }

    #[tokio::test]
    async fn reject_strategy_fails_when_full() {
        let (tx, _rx) = bounded::<Note>(1, BackpressureStrategy::Reject);

        tx.send(MessageEnvelope::new(Note("first"))).await.unwrap();
        let result = tx.send(MessageEnvelope::new(Note("second"))).await;

        assert_eq!(result, Err(MailboxError::Full { capacity: 1 }));
    }

    #[tokio::test]
    async fn drop_newest_strategy_discards_overflow() {
        let (tx, mut rx) = bounded::<Note>(1, BackpressureStrategy::DropNewest);

        tx.send(MessageEnvelope::new(Note("kept"))).await.unwrap();
        tx.send(MessageEnvelope::new(Note("dropped"))).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().payload, Note("kept"));
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn send_to_dropped_receiver_reports_closed() {
        let (tx, rx) = bounded::<Note>(4, BackpressureStrategy::Block);
        drop(rx);

        let result = tx.send(MessageEnvelope::new(Note("lost"))).await;
        assert_eq!(result, Err(MailboxError::Closed));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn recv_returns_none_after_senders_drop() {
        let (tx, mut rx) = unbounded::<Note>();
        tx.send(MessageEnvelope::new(Note("last"))).await.unwrap();
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().payload, Note("last"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_timeout_fires_when_full() {
        let (tx, _rx) = bounded::<Note>(1, BackpressureStrategy::Block);
        tx.send(MessageEnvelope::new(Note("fill"))).await.unwrap();

        let result = tx
            .send_timeout(MessageEnvelope::new(Note("late")), Duration::from_millis(20))
            .await;
        assert_eq!(
            result,
            Err(MailboxError::SendTimeout(Duration::from_millis(20)))
        );
    }
}
