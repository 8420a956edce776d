//! Actor system: shared-resource lifecycle and the executor glue.
//!
//! The system creates the process-wide registry and bus once at startup,
//! hands shared references to every task that needs them, spawns the router
//! loop, and tears everything down at shutdown. Neither the registry nor the
//! bus is ambient global state; they live and die with the system that
//! constructed them.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use kestrel_api::actor::Actor;
use kestrel_api::address::ActorAddress;
use kestrel_api::message::{Message, MessageEnvelope};
use kestrel_api::monitor::{Monitor, NoopMonitor};

use crate::bus::router::{Router, RouterStats};
use crate::bus::{ActorRegistry, BusError, MessageBus};
use crate::mailbox::{self, BackpressureStrategy};
use crate::monitor::events::BusEvent;

/// Errors related to the actor system itself.
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Actor system is not running")]
    NotRunning,

    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    #[error("Registration error: {0}")]
    Registration(#[from] BusError),

    #[error("Internal system error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Lifecycle state of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Running,
    ShuttingDown,
    Stopped,
}

/// System-wide defaults.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Capacity of mailboxes created by `spawn`.
    pub mailbox_capacity: usize,

    /// Backpressure applied by spawned actors' mailboxes.
    pub backpressure: BackpressureStrategy,

    /// Deadline for draining actors during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            backpressure: BackpressureStrategy::Block,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// The in-process actor system.
///
/// Cheap to clone; all clones share the same registry, bus and state.
pub struct ActorSystem<M, MO = NoopMonitor<BusEvent>>
where
    M: Message,
    MO: Monitor<BusEvent>,
{
    inner: Arc<SystemInner<M, MO>>,
}

struct SystemInner<M, MO>
where
    M: Message,
    MO: Monitor<BusEvent>,
{
    config: SystemConfig,
    registry: ActorRegistry<M>,
    bus: MessageBus<M>,
    state: Arc<RwLock<SystemState>>,
    stats: Arc<RouterStats>,
    router_handle: Mutex<Option<JoinHandle<()>>>,
    actors: DashMap<ActorAddress, JoinHandle<()>>,
    _monitor: std::marker::PhantomData<fn() -> MO>,
}

impl<M: Message> ActorSystem<M, NoopMonitor<BusEvent>> {
    /// Creates a system with no bus-event monitoring.
    pub fn new(config: SystemConfig) -> Self {
        Self::with_monitor(config, NoopMonitor::new())
    }
}

impl<M, MO> ActorSystem<M, MO>
where
    M: Message,
    MO: Monitor<BusEvent>,
{
    /// Creates a system whose router records bus events into `monitor`,
    /// then starts the router task.
    pub fn with_monitor(config: SystemConfig, monitor: MO) -> Self {
        let registry = ActorRegistry::new();
        let bus = MessageBus::new();
        let state = Arc::new(RwLock::new(SystemState::Running));
        let stats = Arc::new(RouterStats::default());

        let router = Router::new(
            bus.subscribe(),
            registry.clone(),
            Arc::clone(&state),
            Arc::clone(&stats),
            monitor,
        );
        let router_handle = tokio::spawn(router.run());

        Self {
            inner: Arc::new(SystemInner {
                config,
                registry,
                bus,
                state,
                stats,
                router_handle: Mutex::new(Some(router_handle)),
                actors: DashMap::new(),
                _monitor: std::marker::PhantomData,
            }),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    /// The process-wide bus. Use it to publish, request, and subscribe.
    pub fn bus(&self) -> &MessageBus<M> {
        &self.inner.bus
    }

    /// The process-wide registry.
    pub fn registry(&self) -> &ActorRegistry<M> {
        &self.inner.registry
    }

    /// Router delivery counters.
    pub fn router_stats(&self) -> &RouterStats {
        &self.inner.stats
    }

    pub fn state(&self) -> SystemState {
        *self.inner.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SystemState::Running
    }

    /// Number of actors spawned through this system and still tracked.
    pub fn actor_count(&self) -> usize {
        self.inner.actors.len()
    }

    /// Registers `actor` under `address` and starts its processing loop.
    ///
    /// The loop pulls envelopes from the actor's mailbox in FIFO order and
    /// hands them to `handle_message`. Handler errors are logged and do not
    /// stop the loop; supervision of actors is layered on top via the
    /// supervisor engine, not baked into the executor.
    pub fn spawn<A>(&self, mut actor: A, address: ActorAddress) -> Result<ActorAddress, SystemError>
    where
        A: Actor<Message = M>,
    {
        if !self.is_running() {
            return Err(SystemError::NotRunning);
        }

        let (sender, mut receiver) = mailbox::bounded::<M>(
            self.inner.config.mailbox_capacity,
            self.inner.config.backpressure,
        );
        self.inner.registry.register(address.clone(), sender);

        let task_address = address.clone();
        let handle = tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                if let Err(err) = actor.handle_message(envelope).await {
                    warn!(actor = %task_address, error = %err, "message handler failed");
                }
            }
            debug!(actor = %task_address, "mailbox closed, actor loop ending");
        });

        self.inner.actors.insert(address.clone(), handle);
        Ok(address)
    }

    /// Publishes an envelope on the bus (convenience passthrough).
    pub fn publish(&self, envelope: MessageEnvelope<M>) -> Result<(), BusError> {
        self.inner.bus.publish(envelope)
    }

    /// Deregisters and stops one spawned actor.
    ///
    /// The actor finishes the envelopes already in its mailbox before its
    /// loop ends.
    pub async fn stop_actor(&self, address: &ActorAddress) -> Result<(), SystemError> {
        self.inner.registry.unregister(address)?;
        if let Some((_, handle)) = self.inner.actors.remove(address) {
            // Registry drop released the only sender; the loop drains and exits.
            let _ = handle.await;
        }
        Ok(())
    }

    /// Gracefully shuts the system down.
    ///
    /// New envelopes stop being routed, registered actors are deregistered,
    /// and their loops are given `shutdown_timeout` to drain. Actors still
    /// running past the deadline are aborted and the timeout is reported.
    pub async fn shutdown(&self) -> Result<(), SystemError> {
        {
            let mut state = self.inner.state.write();
            if *state != SystemState::Running {
                return Err(SystemError::NotRunning);
            }
            *state = SystemState::ShuttingDown;
        }

        // Dropping registry entries closes each actor's mailbox senders, so
        // the loops drain in-flight envelopes and exit on their own.
        let addresses: Vec<ActorAddress> = self
            .inner
            .actors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for address in &addresses {
            let _ = self.inner.registry.unregister(address);
        }

        let mut handles: Vec<(ActorAddress, JoinHandle<()>)> = addresses
            .into_iter()
            .filter_map(|address| {
                self.inner
                    .actors
                    .remove(&address)
                    .map(|(_, handle)| (address, handle))
            })
            .collect();

        let deadline = self.inner.config.shutdown_timeout;
        let drained = timeout(
            deadline,
            join_all(handles.iter_mut().map(|(_, handle)| handle)),
        )
        .await;

        let mut timed_out = false;
        if drained.is_err() {
            for (address, handle) in &handles {
                if !handle.is_finished() {
                    warn!(actor = %address, "actor did not drain before shutdown deadline, aborting");
                    handle.abort();
                    timed_out = true;
                }
            }
        }

        if let Some(router) = self.inner.router_handle.lock().take() {
            router.abort();
        }

        *self.inner.state.write() = SystemState::Stopped;

        if timed_out {
            Err(SystemError::ShutdownTimeout(deadline))
        } else {
            Ok(())
        }
    }
}

impl<M, MO> Clone for ActorSystem<M, MO>
where
    M: Message,
    MO: Monitor<BusEvent>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
