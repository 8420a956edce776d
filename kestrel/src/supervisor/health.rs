//! Background health monitoring for a supervisor node.
//!
//! The monitor runs on a fixed interval, probing every child of the wrapped
//! node. Failed probes feed the supervisor's regular failure path, so
//! strategy and backoff treat probe failures exactly like crashes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::warn;

use kestrel_api::monitor::Monitor;

use super::child::Child;
use super::node::SupervisorNode;
use crate::monitor::events::SupervisionEvent;

/// Spawns the periodic health-check task for a shared supervisor node.
///
/// Returns the task handle and a shutdown sender; sending `()` (or dropping
/// the sender) stops the task. The task also stops on its own when health
/// monitoring is disabled on the node.
pub fn spawn_health_monitor<C, M>(
    supervisor: Arc<Mutex<SupervisorNode<C, M>>>,
    check_interval: Duration,
) -> (JoinHandle<()>, oneshot::Sender<()>)
where
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let mut ticker = interval(check_interval);
        // The first tick fires immediately; skip it so the initial probe
        // happens one interval after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    let mut node = supervisor.lock().await;

                    if !node.is_health_monitoring_enabled() {
                        break;
                    }

                    let child_ids = node.child_ids().to_vec();
                    for child_id in child_ids {
                        if let Err(err) = node.check_child_health(&child_id).await {
                            warn!(child = %child_id, error = %err, "health check error");
                        }
                    }
                }
            }
        }
    });

    (handle, shutdown_tx)
}
