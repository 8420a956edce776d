//! Envelope behavior visible to consumers of the contract crate.

use std::time::Duration;

use kestrel_api::address::ActorAddress;
use kestrel_api::message::{Message, MessageEnvelope, MessagePriority};

#[derive(Debug, Clone, PartialEq)]
struct Report {
    body: String,
}

impl Message for Report {
    const MESSAGE_TYPE: &'static str = "report";

    fn priority(&self) -> MessagePriority {
        MessagePriority::High
    }
}

#[test]
fn envelope_carries_payload_and_routing_metadata() {
    let recipient = ActorAddress::named("auditor");
    let sender = ActorAddress::anonymous();

    let envelope = MessageEnvelope::new(Report {
        body: "all clear".into(),
    })
    .with_recipient(recipient.clone())
    .with_sender(sender.clone())
    .with_ttl(Duration::from_secs(5));

    assert_eq!(envelope.payload.body, "all clear");
    assert_eq!(envelope.recipient, Some(recipient));
    assert_eq!(envelope.sender, Some(sender));
    assert_eq!(envelope.priority, MessagePriority::High);
    assert_eq!(envelope.message_type(), "report");
    assert!(!envelope.is_expired());
}

#[test]
fn cloned_envelopes_are_independent_values() {
    let original = MessageEnvelope::new(Report {
        body: "copy me".into(),
    })
    .with_recipient(ActorAddress::named("worker"));

    let clone = original.clone();
    assert_eq!(clone.payload, original.payload);
    assert_eq!(clone.recipient, original.recipient);
    assert_eq!(clone.created_at, original.created_at);
}
