//! Supervisor node: child lifecycle, failure handling, health checks.
//!
//! A node exclusively owns everything it supervises: the child instances,
//! their specs, their backoff trackers, and the start order. No other task
//! touches this state, so the node itself needs no internal locking; callers
//! that share a node across tasks wrap it in `tokio::sync::Mutex` (as the
//! background health monitor does).

use std::collections::HashMap;
use std::error::Error as StdError;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use kestrel_api::monitor::{Monitor, NoopMonitor};

use super::backoff::RestartBackoff;
use super::child::{Child, ChildHandle};
use super::error::SupervisorError;
use super::strategy::RestartStrategy;
use super::types::{
    ChildHealth, ChildId, ChildSpec, ChildState, ChildStatus, FailureOutcome, SupervisorId,
    SupervisorState,
};
use crate::monitor::events::{SupervisionEvent, SupervisionEventKind};

/// Health-check configuration and per-child failure tracking.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Interval used by the background health monitor.
    pub check_interval: Duration,

    /// Deadline for each individual probe.
    pub check_timeout: Duration,

    /// Consecutive failed probes before the child enters the failure path.
    pub failure_threshold: u32,

    consecutive_failures: HashMap<ChildId, u32>,
}

impl HealthConfig {
    pub fn new(check_interval: Duration, check_timeout: Duration, failure_threshold: u32) -> Self {
        Self {
            check_interval,
            check_timeout,
            failure_threshold,
            consecutive_failures: HashMap::new(),
        }
    }

    fn bump(&mut self, id: &ChildId) -> u32 {
        let count = self.consecutive_failures.entry(*id).or_insert(0);
        *count += 1;
        *count
    }

    fn clear(&mut self, id: &ChildId) {
        self.consecutive_failures.remove(id);
    }
}

struct ChildEntry<C> {
    spec: ChildSpec<C>,
    handle: ChildHandle<C>,
    backoff: RestartBackoff,
}

/// Supervisor over a set of children with one restart strategy.
pub struct SupervisorNode<C, M = NoopMonitor<SupervisionEvent>>
where
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    id: SupervisorId,
    strategy: RestartStrategy,
    children: HashMap<ChildId, ChildEntry<C>>,
    child_order: Vec<ChildId>,
    monitor: M,
    state: SupervisorState,
    backoff_template: RestartBackoff,
    health: Option<HealthConfig>,
}

impl<C, M> SupervisorNode<C, M>
where
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    /// Creates a node with the default restart budget (5 per 60s).
    pub fn new(strategy: RestartStrategy, monitor: M) -> Self {
        Self::with_backoff(strategy, monitor, RestartBackoff::default())
    }

    /// Creates a node whose children each get a copy of `backoff` as their
    /// restart budget.
    pub fn with_backoff(strategy: RestartStrategy, monitor: M, backoff: RestartBackoff) -> Self {
        Self {
            id: SupervisorId::new(),
            strategy,
            children: HashMap::new(),
            child_order: Vec::new(),
            monitor,
            state: SupervisorState::Running,
            backoff_template: backoff,
            health: None,
        }
    }

    pub fn id(&self) -> SupervisorId {
        self.id
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn strategy(&self) -> RestartStrategy {
        self.strategy
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_child(&self, id: &ChildId) -> bool {
        self.children.contains_key(id)
    }

    /// Child ids in start order.
    pub fn child_ids(&self) -> &[ChildId] {
        &self.child_order
    }

    pub fn child_state(&self, id: &ChildId) -> Option<ChildState> {
        self.children.get(id).map(|entry| entry.handle.state())
    }

    pub fn child_restart_count(&self, id: &ChildId) -> Option<u32> {
        self.children
            .get(id)
            .map(|entry| entry.handle.restart_count())
    }

    /// Constructs a child from its spec and runs it up to `Running`.
    ///
    /// The spec is retained so the child can be rebuilt on every restart.
    pub async fn start_child(&mut self, spec: ChildSpec<C>) -> Result<ChildId, SupervisorError> {
        if self.state != SupervisorState::Running {
            return Err(SupervisorError::NotRunning);
        }

        let id = ChildId::new();
        let mut handle = ChildHandle::new((spec.factory)());

        self.run_start(&id, &spec.label, &mut handle, spec.start_timeout)
            .await?;

        self.children.insert(
            id,
            ChildEntry {
                spec,
                handle,
                backoff: self.backoff_template.clone(),
            },
        );
        self.child_order.push(id);

        Ok(id)
    }

    /// Stops one child according to its shutdown policy and removes it.
    ///
    /// On a stop error the child is kept in `Failed` state so the caller can
    /// retry; on graceful completion or forced timeout it is removed.
    pub async fn stop_child(&mut self, id: &ChildId) -> Result<(), SupervisorError> {
        let entry = self
            .children
            .get_mut(id)
            .ok_or(SupervisorError::ChildNotFound { id: *id })?;

        let label = entry.spec.label.clone();
        let policy = entry.spec.shutdown_policy;
        entry.handle.set_state(ChildState::Stopping);

        let result = Self::run_stop(&mut entry.handle, policy.timeout()).await;

        match result {
            Ok(()) => {
                entry.handle.set_state(ChildState::Stopped);
                self.record(Some(id), SupervisionEventKind::ChildStopped);
                self.remove_child(id);
                Ok(())
            }
            Err(StopFailure::Timeout(timeout)) => {
                // Forced termination: the instance is discarded with the entry.
                entry.handle.set_state(ChildState::Stopped);
                self.record_event(
                    SupervisionEvent::now(
                        self.id.to_string(),
                        Some(id.to_string()),
                        SupervisionEventKind::ChildStopped,
                    )
                    .with_metadata("forced", "true"),
                );
                self.remove_child(id);
                Err(SupervisorError::ShutdownTimeout { label, timeout })
            }
            Err(StopFailure::Error(source)) => {
                entry.handle.set_state(ChildState::Failed);
                self.record(
                    Some(id),
                    SupervisionEventKind::ChildFailed {
                        error: source.to_string(),
                        restart_count: self
                            .children
                            .get(id)
                            .map(|e| e.handle.restart_count())
                            .unwrap_or(0),
                    },
                );
                Err(SupervisorError::ChildStopFailed { label, source })
            }
        }
    }

    /// Applies the restart strategy after a child failure.
    ///
    /// The failed child is marked `Failed` and the strategy's restart set is
    /// processed in original start order. Children whose restart budget is
    /// exhausted transition to `PermanentlyFailed` and stay down; the node
    /// keeps operating its other children. Temporary children are stopped
    /// rather than restarted.
    pub async fn handle_child_failure(
        &mut self,
        id: &ChildId,
        error: Box<dyn StdError + Send + Sync>,
    ) -> Result<FailureOutcome, SupervisorError> {
        let entry = self
            .children
            .get_mut(id)
            .ok_or(SupervisorError::ChildNotFound { id: *id })?;

        entry.handle.set_state(ChildState::Failed);
        let restart_count = entry.handle.restart_count();
        self.record(
            Some(id),
            SupervisionEventKind::ChildFailed {
                error: error.to_string(),
                restart_count,
            },
        );

        let mut outcome = FailureOutcome::default();

        // Failures reaching this path are abnormal exits, so only Temporary
        // children decline the restart.
        let policy = self.children[id].spec.restart_policy;
        if !policy.should_restart(true) {
            if let Some(entry) = self.children.get_mut(id) {
                let _ = Self::run_stop(&mut entry.handle, entry.spec.shutdown_policy.timeout())
                    .await;
                entry.handle.set_state(ChildState::Stopped);
            }
            self.record(Some(id), SupervisionEventKind::ChildStopped);
            self.remove_child(id);
            outcome.stopped.push(*id);
            return Ok(outcome);
        }

        let restart_set = self.strategy.restart_set(id, &self.child_order);
        self.record(
            Some(id),
            SupervisionEventKind::StrategyApplied {
                strategy: self.strategy.name().to_string(),
                affected_count: restart_set.len(),
            },
        );

        for target in restart_set {
            self.restart_one(&target, &mut outcome).await;
        }

        Ok(outcome)
    }

    /// Restarts a single child, consuming budget and applying the delay.
    async fn restart_one(&mut self, id: &ChildId, outcome: &mut FailureOutcome) {
        let Some(entry) = self.children.get_mut(id) else {
            return;
        };

        if entry.handle.state().is_terminal() {
            return;
        }

        if !entry.backoff.should_restart() {
            let restart_count = entry.backoff.restart_count();
            let window = entry.backoff.window();
            let max_restarts = entry.backoff.max_restarts();
            entry.handle.set_state(ChildState::PermanentlyFailed);
            warn!(
                child = %entry.spec.label,
                restarts = restart_count,
                ?window,
                max = max_restarts,
                "restart budget exhausted, child permanently failed"
            );
            self.record(
                Some(id),
                SupervisionEventKind::RestartLimitExceeded {
                    restart_count,
                    window,
                },
            );
            outcome.exhausted.push(*id);
            return;
        }

        let delay = {
            let entry = self.children.get_mut(id).expect("entry checked above");
            entry.backoff.record_restart()
        };
        if delay > Duration::ZERO {
            sleep(delay).await;
        }

        let entry = self.children.get_mut(id).expect("entry checked above");
        entry.handle.set_state(ChildState::Restarting);

        // Best-effort stop of the old instance; a failing stop does not
        // prevent the replacement from starting.
        let stop_deadline = entry.spec.shutdown_timeout;
        if let Err(failure) = Self::run_stop(&mut entry.handle, Some(stop_deadline)).await {
            debug!(child = %entry.spec.label, ?failure, "old instance did not stop cleanly during restart");
        }

        let fresh = (entry.spec.factory)();
        let _old = entry.handle.replace_instance(fresh);
        entry.handle.record_restart();

        let label = entry.spec.label.clone();
        let start_timeout = entry.spec.start_timeout;
        let restart_count = entry.handle.restart_count();

        let started = {
            let entry = self.children.get_mut(id).expect("entry checked above");
            Self::run_start_inner(&mut entry.handle, start_timeout).await
        };

        match started {
            Ok(()) => {
                self.children
                    .get_mut(id)
                    .expect("entry checked above")
                    .handle
                    .set_state(ChildState::Running);
                self.record(
                    Some(id),
                    SupervisionEventKind::ChildRestarted { restart_count },
                );
                outcome.restarted.push(*id);
            }
            Err(source) => {
                self.children
                    .get_mut(id)
                    .expect("entry checked above")
                    .handle
                    .set_state(ChildState::Failed);
                warn!(child = %label, error = %source, "restart attempt failed");
                self.record(
                    Some(id),
                    SupervisionEventKind::ChildFailed {
                        error: source.to_string(),
                        restart_count,
                    },
                );
                outcome.failed.push(*id);
            }
        }
    }

    /// Stops every child in reverse start order and stops the node.
    ///
    /// All children are attempted even when some fail; the first error is
    /// returned after the sweep completes.
    pub async fn shutdown(&mut self) -> Result<(), SupervisorError> {
        self.state = SupervisorState::ShuttingDown;

        let mut first_error = None;
        for id in self.child_order.clone().into_iter().rev() {
            if let Err(err) = self.stop_child(&id).await {
                warn!(%id, error = %err, "child failed to stop during shutdown");
                first_error.get_or_insert(err);
            }
        }

        self.state = SupervisorState::Stopped;
        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Stops and rebuilds every child from its spec, preserving start order.
    ///
    /// Used when an entire fault domain restarts (tree escalation). Backoff
    /// budgets are reset: the subtree is treated as freshly started.
    pub async fn restart_all_children(&mut self) -> Result<(), SupervisorError> {
        for id in self.child_order.clone().into_iter().rev() {
            if let Some(entry) = self.children.get_mut(&id) {
                let _ =
                    Self::run_stop(&mut entry.handle, entry.spec.shutdown_policy.timeout()).await;
                entry.handle.set_state(ChildState::Stopped);
                self.record(Some(&id), SupervisionEventKind::ChildStopped);
            }
        }

        let mut first_error = None;
        for id in self.child_order.clone() {
            let entry = self.children.get_mut(&id).expect("order matches children");
            let fresh = (entry.spec.factory)();
            entry.handle.replace_instance(fresh);
            entry.backoff.reset();
            let start_timeout = entry.spec.start_timeout;
            let label = entry.spec.label.clone();

            match Self::run_start_inner(&mut entry.handle, start_timeout).await {
                Ok(()) => {
                    entry.handle.set_state(ChildState::Running);
                    self.record(Some(&id), SupervisionEventKind::ChildStarted);
                }
                Err(source) => {
                    entry.handle.set_state(ChildState::Failed);
                    self.record(
                        Some(&id),
                        SupervisionEventKind::ChildFailed {
                            error: source.to_string(),
                            restart_count: 0,
                        },
                    );
                    first_error
                        .get_or_insert(SupervisorError::ChildStartFailed { label, source });
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Per-child status for callers and dashboards.
    pub fn health_snapshot(&self) -> Vec<ChildStatus> {
        self.child_order
            .iter()
            .filter_map(|id| {
                self.children.get(id).map(|entry| ChildStatus {
                    id: *id,
                    label: entry.spec.label.clone(),
                    state: entry.handle.state(),
                    restart_count: entry.handle.restart_count(),
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Health checks
    // ------------------------------------------------------------------

    /// Enables periodic health checking with the given parameters.
    pub fn enable_health_checks(
        &mut self,
        check_interval: Duration,
        check_timeout: Duration,
        failure_threshold: u32,
    ) {
        self.health = Some(HealthConfig::new(
            check_interval,
            check_timeout,
            failure_threshold,
        ));
    }

    pub fn disable_health_checks(&mut self) {
        self.health = None;
    }

    pub fn is_health_monitoring_enabled(&self) -> bool {
        self.health.is_some()
    }

    pub fn health_config(&self) -> Option<&HealthConfig> {
        self.health.as_ref()
    }

    /// Probes one child and feeds a threshold-crossing failure into the
    /// regular failure path, so strategy and backoff apply the same way they
    /// do for crashes.
    pub async fn check_child_health(
        &mut self,
        id: &ChildId,
    ) -> Result<ChildHealth, SupervisorError> {
        let check_timeout = self
            .health
            .as_ref()
            .ok_or(SupervisorError::HealthMonitoringNotEnabled)?
            .check_timeout;

        let entry = self
            .children
            .get(id)
            .ok_or(SupervisorError::ChildNotFound { id: *id })?;

        if entry.handle.state() != ChildState::Running {
            // Only running children are probed; others are already being
            // handled by the lifecycle machinery.
            return Ok(ChildHealth::Healthy);
        }

        let health = match timeout(check_timeout, entry.handle.instance().health_check()).await {
            Ok(health) => health,
            Err(_) => ChildHealth::Failed(format!(
                "health check timed out after {check_timeout:?}"
            )),
        };

        match &health {
            ChildHealth::Healthy => {
                if let Some(config) = self.health.as_mut() {
                    config.clear(id);
                }
            }
            ChildHealth::Degraded(reason) => {
                debug!(%id, reason, "child degraded");
            }
            ChildHealth::Failed(reason) => {
                let (failures, threshold) = {
                    let config = self.health.as_mut().expect("checked above");
                    (config.bump(id), config.failure_threshold)
                };

                if failures >= threshold {
                    if let Some(config) = self.health.as_mut() {
                        config.clear(id);
                    }
                    let error: Box<dyn StdError + Send + Sync> = Box::new(HealthCheckFailed {
                        reason: reason.clone(),
                        consecutive: failures,
                    });
                    self.handle_child_failure(id, error).await?;
                }
            }
        }

        Ok(health)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn run_start(
        &mut self,
        id: &ChildId,
        label: &str,
        handle: &mut ChildHandle<C>,
        start_timeout: Duration,
    ) -> Result<(), SupervisorError> {
        match Self::run_start_inner(handle, start_timeout).await {
            Ok(()) => {
                handle.set_state(ChildState::Running);
                self.record(Some(id), SupervisionEventKind::ChildStarted);
                Ok(())
            }
            Err(source) => {
                handle.set_state(ChildState::Failed);
                self.record(
                    Some(id),
                    SupervisionEventKind::ChildFailed {
                        error: source.to_string(),
                        restart_count: 0,
                    },
                );
                Err(SupervisorError::ChildStartFailed {
                    label: label.to_string(),
                    source,
                })
            }
        }
    }

    async fn run_start_inner(
        handle: &mut ChildHandle<C>,
        start_timeout: Duration,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        handle.set_state(ChildState::Starting);
        match timeout(start_timeout, handle.instance_mut().start()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(Box::new(err) as Box<dyn StdError + Send + Sync>),
            Err(_) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("start timed out after {start_timeout:?}"),
            ))),
        }
    }

    async fn run_stop(
        handle: &mut ChildHandle<C>,
        deadline: Option<Duration>,
    ) -> Result<(), StopFailure> {
        match deadline {
            Some(deadline) => {
                // The child gets the same deadline it is being held to.
                match timeout(deadline, handle.instance_mut().stop(deadline)).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(StopFailure::Error(Box::new(err))),
                    Err(_) => Err(StopFailure::Timeout(deadline)),
                }
            }
            None => handle
                .instance_mut()
                .stop(Duration::MAX)
                .await
                .map_err(|err| StopFailure::Error(Box::new(err) as Box<dyn StdError + Send + Sync>)),
        }
    }

    fn remove_child(&mut self, id: &ChildId) {
        self.children.remove(id);
        self.child_order.retain(|child| child != id);
        if let Some(config) = self.health.as_mut() {
            config.clear(id);
        }
    }

    fn record(&self, child: Option<&ChildId>, kind: SupervisionEventKind) {
        self.record_event(SupervisionEvent::now(
            self.id.to_string(),
            child.map(ChildId::to_string),
            kind,
        ));
    }

    fn record_event(&self, event: SupervisionEvent) {
        self.monitor.record(event);
    }
}

/// Error injected into the failure path when health probes cross the
/// threshold.
#[derive(Debug)]
struct HealthCheckFailed {
    reason: String,
    consecutive: u32,
}

impl std::fmt::Display for HealthCheckFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "health check failed {} consecutive times: {}",
            self.consecutive, self.reason
        )
    }
}

impl StdError for HealthCheckFailed {}

#[derive(Debug)]
enum StopFailure {
    Error(Box<dyn StdError + Send + Sync>),
    Timeout(Duration),
}
