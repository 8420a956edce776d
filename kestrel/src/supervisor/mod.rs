//! Supervision engine: child lifecycle, restart strategies, backoff,
//! hierarchical trees and health monitoring.
//!
//! A [`SupervisorNode`] owns a set of children built from [`ChildSpec`]s and
//! applies a [`RestartStrategy`] when one fails, within per-child
//! [`RestartBackoff`] budgets. Nodes compose into a [`SupervisorTree`] for
//! fault-isolation domains, and [`health::spawn_health_monitor`] probes
//! children periodically, feeding failures into the same restart machinery.

pub mod backoff;
pub mod child;
pub mod error;
pub mod health;
pub mod node;
pub mod strategy;
pub mod tree;
pub mod types;

pub use backoff::{BackoffCurve, RestartBackoff};
pub use child::{Child, ChildHandle};
pub use error::SupervisorError;
pub use health::spawn_health_monitor;
pub use node::{HealthConfig, SupervisorNode};
pub use strategy::RestartStrategy;
pub use tree::{EscalationOutcome, EscalationPolicy, SupervisorTree};
pub use types::{
    ChildHealth, ChildId, ChildSpec, ChildState, ChildStatus, FailureOutcome, RestartPolicy,
    ShutdownPolicy, SupervisorId, SupervisorState,
};
