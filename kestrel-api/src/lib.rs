//! # Kestrel Actor Runtime API
//!
//! Contract layer for the Kestrel in-process actor runtime. This crate defines
//! the interfaces that the runtime consumes from, and exposes to, the
//! surrounding application layers:
//!
//! - **Addresses**: logical actor identities used as routing keys
//! - **Messages**: the payload contract and the routed envelope
//! - **Actors**: the executor contract (one message in, one result out)
//! - **Monitoring**: the fire-and-forget event sink contract
//! - **Errors**: handler-level failure types
//!
//! The runtime itself (mailboxes, registry, bus, router, supervision) lives in
//! the `kestrel` crate. Keeping the contracts separate lets application code
//! depend only on the interfaces it implements.
//!
//! ## Module Organization
//!
//! - [`address`]: Actor addressing (named, anonymous, pool members)
//! - [`message`]: Message trait, priorities, and envelopes
//! - [`actor`]: Core actor executor trait
//! - [`monitor`]: Monitoring sink contract and severities
//! - [`errors`]: Error types surfaced by actor implementations

pub mod actor;
pub mod address;
pub mod errors;
pub mod message;
pub mod monitor;

pub use actor::Actor;
pub use address::{ActorAddress, ActorId};
pub use errors::ActorError;
pub use message::{Message, MessageEnvelope, MessagePriority};
pub use monitor::{EventSeverity, Monitor, MonitoringEvent, NoopMonitor};
