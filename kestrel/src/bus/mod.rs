//! Message routing bus: registry, publish/subscribe broker, router loop.
//!
//! The registry maps addresses to mailboxes; the broker fans published
//! envelopes out to subscriber streams and correlates request/reply pairs;
//! the router (spawned by the actor system) is the subscriber that resolves
//! recipients and forwards envelopes into mailboxes.

pub mod broker;
pub mod error;
pub mod registry;
pub(crate) mod router;

pub use broker::{BusSubscription, MessageBus};
pub use error::BusError;
pub use registry::{ActorRegistry, PoolStrategy};
pub use router::RouterStats;
