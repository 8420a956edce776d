//! # Actor Error Types
//!
//! Failure modes surfaced by actor implementations to the runtime. These are
//! the errors an actor's `handle_message` can return; runtime-internal
//! failures (routing, mailboxes, supervision) have their own taxonomies in
//! the `kestrel` crate.

use thiserror::Error;

/// Error returned by actor message handlers.
#[derive(Error, Debug)]
pub enum ActorError {
    /// The actor failed to set up required state or resources.
    #[error("Actor initialization failed: {0}")]
    InitializationError(String),

    /// Processing of a message failed.
    #[error("Message handling failed: {0}")]
    MessageHandlingError(String),

    /// An operation was attempted on a stopped actor.
    #[error("Actor stopped")]
    Stopped,

    /// A handler-internal operation exceeded its deadline.
    #[error("Timeout")]
    Timeout,

    /// A reply could not be delivered back to the requester.
    #[error("Reply channel error: {0}")]
    ReplyChannelError(String),

    /// Catch-all preserving the original error chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = ActorError::MessageHandlingError("bad payload".into());
        assert!(err.to_string().contains("bad payload"));
    }

    #[test]
    fn anyhow_errors_convert() {
        let err: ActorError = anyhow::anyhow!("downstream failure").into();
        assert!(matches!(err, ActorError::Other(_)));
        assert!(err.to_string().contains("downstream failure"));
    }
}
