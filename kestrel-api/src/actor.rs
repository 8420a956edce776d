//! # Actor Executor Contract
//!
//! The runtime drives actors through a single obligation: given one message
//! envelope, produce a result or an error. Everything else (mailboxes,
//! routing, supervision, restarts) is the runtime's concern, and actors never
//! hold references back into it.

use async_trait::async_trait;

use crate::errors::ActorError;
use crate::message::{Message, MessageEnvelope};

/// Core actor contract.
///
/// Implementations receive envelopes one at a time, in mailbox FIFO order.
/// The runtime owns the instance exclusively while it is running; `&mut self`
/// access is therefore race-free without interior mutability.
///
/// A returned error does not tear the actor down by itself; it is surfaced to
/// the runtime, which logs it and, when the actor runs under supervision,
/// feeds it into the supervisor's failure path.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Payload type this actor consumes.
    type Message: Message;

    /// Handles one message, producing effects or an error.
    async fn handle_message(
        &mut self,
        envelope: MessageEnvelope<Self::Message>,
    ) -> Result<(), ActorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Increment(u64);

    impl Message for Increment {
        const MESSAGE_TYPE: &'static str = "increment";
    }

    struct Counter {
        total: u64,
    }

    #[async_trait]
    impl Actor for Counter {
        type Message = Increment;

        async fn handle_message(
            &mut self,
            envelope: MessageEnvelope<Increment>,
        ) -> Result<(), ActorError> {
            self.total += envelope.payload.0;
            Ok(())
        }
    }

    #[tokio::test]
    async fn actor_processes_messages_in_order() {
        let mut counter = Counter { total: 0 };
        for n in 1..=3 {
            counter
                .handle_message(MessageEnvelope::new(Increment(n)))
                .await
                .unwrap();
        }
        assert_eq!(counter.total, 6);
    }
}
