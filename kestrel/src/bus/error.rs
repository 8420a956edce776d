//! Error types for the routing bus and address registry.

use std::time::Duration;

use thiserror::Error;

use kestrel_api::address::ActorAddress;

/// Failure modes of registry and bus operations.
///
/// A request that times out waiting for its reply is NOT represented here:
/// `publish_request` returns `Ok(None)` for that case, because an absent
/// reply is an expected outcome callers must handle, not a fault.
#[derive(Error, Debug)]
pub enum BusError {
    /// The address is not present in the registry.
    #[error("Address not found: {0}")]
    AddressNotFound(ActorAddress),

    /// The target actor's mailbox no longer accepts messages.
    #[error("Mailbox closed for actor: {0}")]
    MailboxClosed(ActorAddress),

    /// Delivery into a mailbox exceeded the allowed time.
    #[error("Send timeout: target={target}, timeout={timeout:?}")]
    SendTimeout {
        target: ActorAddress,
        timeout: Duration,
    },

    /// The envelope carries no recipient information. Publishing such an
    /// envelope is a configuration error on the sender's side.
    #[error("Envelope of type '{message_type}' has no recipient")]
    MissingRecipient { message_type: &'static str },

    /// The named pool does not exist.
    #[error("Actor pool not found: {0}")]
    PoolNotFound(String),

    /// The named pool exists but has no members.
    #[error("Actor pool is empty: {0}")]
    PoolEmpty(String),

    /// A reply arrived whose concrete type does not match what the requester
    /// asked for.
    #[error("Reply type mismatch: expected '{expected}'")]
    ReplyTypeMismatch { expected: &'static str },

    /// Internal registry failure.
    #[error("Registry error: {0}")]
    Registry(String),
}
