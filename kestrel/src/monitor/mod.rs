//! Runtime monitoring: event types and sink implementations.
//!
//! The sink contract ([`kestrel_api::monitor::Monitor`]) lives in the API
//! crate; this module provides the event families the runtime emits and the
//! in-memory sink used for tests and introspection.

pub mod events;
pub mod memory;

pub use events::{BusEvent, BusEventKind, SupervisionEvent, SupervisionEventKind};
pub use memory::{InMemoryMonitor, MonitoringConfig, MonitoringSnapshot};
