//! Error types for supervisor operations.

use std::error::Error;
use std::time::Duration;

use thiserror::Error;

use super::types::{ChildId, SupervisorId};

/// Failure modes of supervision operations.
///
/// Every condition here is also recorded as a supervision event through the
/// monitor sink; the return value and the event log always agree.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No child with the given id.
    #[error("Child not found: {id}")]
    ChildNotFound { id: ChildId },

    /// The child's factory product failed to start, or start timed out.
    #[error("Failed to start child '{label}': {source}")]
    ChildStartFailed {
        label: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// The child failed to stop.
    #[error("Failed to stop child '{label}': {source}")]
    ChildStopFailed {
        label: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// Restart budget exhausted inside the sliding window. Terminal for the
    /// child, not for the supervisor.
    #[error("Restart limit exceeded for child '{label}': {max_restarts} restarts in {window:?}")]
    RestartLimitExceeded {
        label: String,
        max_restarts: u32,
        window: Duration,
    },

    /// Graceful shutdown did not finish before the deadline; the child was
    /// forcibly discarded.
    #[error("Child '{label}' shutdown timed out after {timeout:?}")]
    ShutdownTimeout { label: String, timeout: Duration },

    /// The supervisor is not accepting new work (shutting down or stopped).
    #[error("Supervisor is not running")]
    NotRunning,

    /// Health operations require health checks to be enabled first.
    #[error("Health monitoring not enabled")]
    HealthMonitoringNotEnabled,

    /// The supervisor tree has no node with the given id.
    #[error("Unknown supervisor: {id}")]
    UnknownSupervisor { id: SupervisorId },
}

impl SupervisorError {
    /// Fatal conditions should be escalated rather than retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SupervisorError::RestartLimitExceeded { .. })
    }

    /// Transient conditions that may succeed on a subsequent attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SupervisorError::ChildStartFailed { .. }
                | SupervisorError::ChildStopFailed { .. }
                | SupervisorError::ShutdownTimeout { .. }
        )
    }
}
