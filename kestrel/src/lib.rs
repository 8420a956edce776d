// Kestrel Actor Runtime
//
// In-process actor runtime built around two subsystems: a message routing
// bus (registry, publish/subscribe broker, router loop) and a supervision
// engine (child lifecycle, restart strategies, backoff, supervision trees,
// health monitoring). Contracts consumed by application code live in the
// `kestrel-api` crate.

pub mod bus;
pub mod logging;
pub mod mailbox;
pub mod monitor;
pub mod supervisor;
pub mod system;

pub use bus::{ActorRegistry, BusError, BusSubscription, MessageBus, PoolStrategy, RouterStats};
pub use mailbox::{BackpressureStrategy, MailboxError, MailboxReceiver, MailboxSender};
pub use monitor::{BusEvent, InMemoryMonitor, MonitoringConfig, SupervisionEvent};
pub use supervisor::{
    BackoffCurve, Child, ChildHealth, ChildId, ChildSpec, ChildState, ChildStatus,
    EscalationPolicy, FailureOutcome, RestartBackoff, RestartPolicy, RestartStrategy,
    ShutdownPolicy, SupervisorError, SupervisorNode, SupervisorTree,
};
pub use system::{ActorSystem, SystemConfig, SystemError, SystemState};

// Re-export the contract crate so applications can depend on `kestrel` alone.
pub use kestrel_api as api;
