//! Core types for the supervision engine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildId(Uuid);

impl ChildId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChildId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a supervisor node within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupervisorId(Uuid);

impl SupervisorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SupervisorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SupervisorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When a child should be restarted after it terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    /// Always restart.
    Permanent,
    /// Restart only after an abnormal exit.
    Transient,
    /// Never restart.
    Temporary,
}

impl RestartPolicy {
    /// Whether a child with this policy restarts given how it exited.
    pub fn should_restart(&self, is_error: bool) -> bool {
        match self {
            RestartPolicy::Permanent => true,
            RestartPolicy::Transient => is_error,
            RestartPolicy::Temporary => false,
        }
    }
}

/// How a child should be brought down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Attempt graceful shutdown, force termination past the timeout.
    Graceful(Duration),
    /// Terminate immediately without a graceful attempt.
    Immediate,
    /// Wait for graceful shutdown without a deadline.
    Unbounded,
}

impl ShutdownPolicy {
    /// The deadline for this policy, `None` meaning no deadline.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            ShutdownPolicy::Graceful(duration) => Some(*duration),
            ShutdownPolicy::Immediate => Some(Duration::ZERO),
            ShutdownPolicy::Unbounded => None,
        }
    }
}

/// Lifecycle state of a supervised child.
///
/// Happy path: `Starting → Running → Stopping → Stopped`.
/// Failure path: `Running → Failed → Restarting → Starting`, terminating in
/// `Stopped` (deliberate) or `PermanentlyFailed` (restart budget exhausted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
    Restarting,
    PermanentlyFailed,
}

impl ChildState {
    /// Terminal states never transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChildState::Stopped | ChildState::PermanentlyFailed)
    }
}

/// Result of a child health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildHealth {
    /// Operating normally.
    Healthy,
    /// Operating but impaired; observed, not yet acted on.
    Degraded(String),
    /// Not operating; counts toward the failure threshold.
    Failed(String),
}

/// Lifecycle state of a supervisor node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisorState {
    Running,
    ShuttingDown,
    Stopped,
}

/// Immutable description of how to run one child.
///
/// The factory is a plain closure, so a supervisor can rebuild the child any
/// number of times from its original description.
pub struct ChildSpec<C> {
    /// Label for logging and events; not required to be unique.
    pub label: String,

    /// Builds a fresh child instance for every (re)start.
    pub factory: Box<dyn Fn() -> C + Send + Sync>,

    /// When to restart this child.
    pub restart_policy: RestartPolicy,

    /// How to stop this child.
    pub shutdown_policy: ShutdownPolicy,

    /// Deadline for `start()` to complete.
    pub start_timeout: Duration,

    /// Deadline used when stopping during restarts.
    pub shutdown_timeout: Duration,
}

impl<C> ChildSpec<C> {
    /// Creates a spec with production defaults: permanent restart, 5s
    /// graceful shutdown, 30s start timeout.
    pub fn new<F>(label: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            factory: Box::new(factory),
            restart_policy: RestartPolicy::Permanent,
            shutdown_policy: ShutdownPolicy::Graceful(Duration::from_secs(5)),
            start_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl<C> fmt::Debug for ChildSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("label", &self.label)
            .field("restart_policy", &self.restart_policy)
            .field("shutdown_policy", &self.shutdown_policy)
            .field("start_timeout", &self.start_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

/// Per-child view exposed by `health_snapshot`.
#[derive(Debug, Clone)]
pub struct ChildStatus {
    pub id: ChildId,
    pub label: String,
    pub state: ChildState,
    pub restart_count: u32,
}

/// What a strategy application did to each affected child.
#[derive(Debug, Clone, Default)]
pub struct FailureOutcome {
    /// Children restarted successfully.
    pub restarted: Vec<ChildId>,

    /// Children whose restart budget was exhausted; now PermanentlyFailed.
    pub exhausted: Vec<ChildId>,

    /// Children stopped instead of restarted (Temporary policy).
    pub stopped: Vec<ChildId>,

    /// Children whose restart attempt itself failed; left in Failed state.
    pub failed: Vec<ChildId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_policy_decision_table() {
        assert!(RestartPolicy::Permanent.should_restart(true));
        assert!(RestartPolicy::Permanent.should_restart(false));
        assert!(RestartPolicy::Transient.should_restart(true));
        assert!(!RestartPolicy::Transient.should_restart(false));
        assert!(!RestartPolicy::Temporary.should_restart(true));
        assert!(!RestartPolicy::Temporary.should_restart(false));
    }

    #[test]
    fn shutdown_policy_timeouts() {
        assert_eq!(
            ShutdownPolicy::Graceful(Duration::from_secs(5)).timeout(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(ShutdownPolicy::Immediate.timeout(), Some(Duration::ZERO));
        assert_eq!(ShutdownPolicy::Unbounded.timeout(), None);
    }

    #[test]
    fn terminal_states() {
        assert!(ChildState::Stopped.is_terminal());
        assert!(ChildState::PermanentlyFailed.is_terminal());
        assert!(!ChildState::Running.is_terminal());
        assert!(!ChildState::Failed.is_terminal());
    }

    #[test]
    fn child_ids_are_unique() {
        assert_ne!(ChildId::new(), ChildId::new());
    }

    #[test]
    fn spec_defaults() {
        let spec = ChildSpec::new("worker", || ());
        assert_eq!(spec.restart_policy, RestartPolicy::Permanent);
        assert_eq!(
            spec.shutdown_policy,
            ShutdownPolicy::Graceful(Duration::from_secs(5))
        );
        assert_eq!(spec.start_timeout, Duration::from_secs(30));
    }

    #[test]
    fn spec_builder_overrides() {
        let spec = ChildSpec::new("task", || ())
            .with_restart_policy(RestartPolicy::Temporary)
            .with_shutdown_policy(ShutdownPolicy::Immediate)
            .with_start_timeout(Duration::from_secs(1));
        assert_eq!(spec.restart_policy, RestartPolicy::Temporary);
        assert_eq!(spec.shutdown_policy, ShutdownPolicy::Immediate);
        assert_eq!(spec.start_timeout, Duration::from_secs(1));
    }
}
