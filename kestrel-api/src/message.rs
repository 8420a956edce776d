//! # Message Module
//!
//! ## Key Concepts
//! - Message: The payload contract for everything sent through the bus
//! - MessagePriority: Scheduling hint carried on every envelope
//! - MessageEnvelope: Routing metadata wrapped around a payload
//!
//! ## Design Principles
//! - Payloads are immutable once constructed and safely shareable across
//!   task boundaries (Clone + Send)
//! - Envelopes are created per send and consumed exactly once by the router;
//!   ownership transfers from sender to mailbox
//! - No wire format: all payloads are in-process values

use std::fmt::Debug;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::ActorAddress;

/// Priority tag attached to every envelope.
///
/// Priorities are hints for mailbox and scheduler implementations; within a
/// single mailbox delivery order is always FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessagePriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for MessagePriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Contract for message payloads.
///
/// Payloads are plain data: immutable once constructed, cloneable for
/// broadcast fan-out, and sendable across the async boundary. The associated
/// `MESSAGE_TYPE` constant names the payload for logging and routing
/// diagnostics without reflection.
pub trait Message: Debug + Clone + Send + 'static {
    /// Stable type name used in logs and routing errors.
    const MESSAGE_TYPE: &'static str;

    /// Priority for this payload. Defaults to [`MessagePriority::Normal`].
    fn priority(&self) -> MessagePriority {
        MessagePriority::Normal
    }
}

/// Routed wrapper around a message payload.
///
/// Carries everything the bus and router need: optional sender for reply
/// capability, optional recipient for routing, optional correlation id for
/// request-reply tracking, optional reply-to address, optional time-to-live,
/// the payload's priority, and a creation timestamp.
#[derive(Debug, Clone)]
pub struct MessageEnvelope<M: Message> {
    /// The message payload. Ownership moves with the envelope.
    pub payload: M,

    /// Address of the sending actor, if any.
    pub sender: Option<ActorAddress>,

    /// Address the router should deliver to.
    pub recipient: Option<ActorAddress>,

    /// Address replies should be directed at, when different from `sender`.
    pub reply_to: Option<ActorAddress>,

    /// Correlation id linking a request to its eventual reply.
    pub correlation_id: Option<Uuid>,

    /// Time-to-live. Envelopes older than this are dropped by the router.
    pub ttl: Option<Duration>,

    /// Priority extracted from the payload at creation.
    pub priority: MessagePriority,

    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl<M: Message> MessageEnvelope<M> {
    /// Creates an envelope with no routing metadata.
    pub fn new(payload: M) -> Self {
        let priority = payload.priority();
        Self {
            payload,
            sender: None,
            recipient: None,
            reply_to: None,
            correlation_id: None,
            ttl: None,
            priority,
            created_at: SystemTime::now(),
        }
    }

    /// Sets the sender address.
    pub fn with_sender(mut self, sender: ActorAddress) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the recipient address.
    pub fn with_recipient(mut self, recipient: ActorAddress) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Sets the reply-to address.
    pub fn with_reply_to(mut self, reply_to: ActorAddress) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Sets the correlation id.
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Sets the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns true if the envelope has outlived its TTL.
    ///
    /// Envelopes without a TTL never expire. Clock skew that makes the
    /// envelope appear to be from the future is treated as not expired.
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self
                .created_at
                .elapsed()
                .map(|age| age > ttl)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Returns the payload's type name.
    pub fn message_type(&self) -> &'static str {
        M::MESSAGE_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Ping;

    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[derive(Debug, Clone)]
    struct Urgent;

    impl Message for Urgent {
        const MESSAGE_TYPE: &'static str = "urgent";

        fn priority(&self) -> MessagePriority {
            MessagePriority::Critical
        }
    }

    #[test]
    fn new_envelope_has_no_routing_metadata() {
        let envelope = MessageEnvelope::new(Ping);
        assert_eq!(envelope.message_type(), "ping");
        assert!(envelope.sender.is_none());
        assert!(envelope.recipient.is_none());
        assert!(envelope.reply_to.is_none());
        assert!(envelope.correlation_id.is_none());
        assert!(envelope.ttl.is_none());
        assert_eq!(envelope.priority, MessagePriority::Normal);
    }

    #[test]
    fn priority_is_extracted_from_payload() {
        let envelope = MessageEnvelope::new(Urgent);
        assert_eq!(envelope.priority, MessagePriority::Critical);
    }

    #[test]
    fn builder_methods_set_fields() {
        let sender = ActorAddress::named("sender");
        let recipient = ActorAddress::named("recipient");
        let id = Uuid::new_v4();

        let envelope = MessageEnvelope::new(Ping)
            .with_sender(sender.clone())
            .with_recipient(recipient.clone())
            .with_correlation_id(id)
            .with_ttl(Duration::from_secs(30));

        assert_eq!(envelope.sender, Some(sender));
        assert_eq!(envelope.recipient, Some(recipient));
        assert_eq!(envelope.correlation_id, Some(id));
        assert_eq!(envelope.ttl, Some(Duration::from_secs(30)));
    }

    #[test]
    fn fresh_envelope_is_not_expired() {
        let envelope = MessageEnvelope::new(Ping).with_ttl(Duration::from_secs(60));
        assert!(!envelope.is_expired());
    }

    #[test]
    fn envelope_without_ttl_never_expires() {
        let envelope = MessageEnvelope::new(Ping);
        assert!(!envelope.is_expired());
    }

    #[test]
    fn zero_ttl_envelope_expires() {
        let mut envelope = MessageEnvelope::new(Ping).with_ttl(Duration::ZERO);
        envelope.created_at = SystemTime::now() - Duration::from_millis(10);
        assert!(envelope.is_expired());
    }

    #[test]
    fn priority_ordering() {
        assert!(MessagePriority::Critical > MessagePriority::High);
        assert!(MessagePriority::High > MessagePriority::Normal);
        assert!(MessagePriority::Normal > MessagePriority::Low);
    }
}
