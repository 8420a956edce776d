//! Background health monitor: periodic probing drives automatic restarts.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;

use kestrel::supervisor::{
    spawn_health_monitor, BackoffCurve, Child, ChildHealth, ChildSpec, RestartBackoff,
    RestartStrategy, SupervisorNode,
};
use kestrel_api::monitor::NoopMonitor;

#[derive(Debug)]
struct Sensor {
    starts: Arc<AtomicU32>,
    healthy: Arc<AtomicBool>,
}

#[async_trait]
impl Child for Sensor {
    type Error = std::io::Error;

    async fn start(&mut self) -> Result<(), Self::Error> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self, _timeout: Duration) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn health_check(&self) -> ChildHealth {
        if self.healthy.load(Ordering::SeqCst) {
            ChildHealth::Healthy
        } else {
            ChildHealth::Failed("sensor offline".to_string())
        }
    }
}

#[tokio::test]
async fn background_monitor_restarts_unhealthy_children() {
    let starts = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicBool::new(true));

    let mut node = SupervisorNode::<Sensor, NoopMonitor<kestrel::SupervisionEvent>>::with_backoff(
        RestartStrategy::OneForOne,
        NoopMonitor::new(),
        RestartBackoff::with_curve(
            5,
            Duration::from_secs(10),
            BackoffCurve::Fixed(Duration::ZERO),
        ),
    );
    node.enable_health_checks(Duration::from_millis(30), Duration::from_millis(100), 1);

    {
        let starts = Arc::clone(&starts);
        let healthy = Arc::clone(&healthy);
        node.start_child(ChildSpec::new("sensor", move || Sensor {
            starts: Arc::clone(&starts),
            healthy: Arc::clone(&healthy),
        }))
        .await
        .unwrap();
    }

    let shared = Arc::new(Mutex::new(node));
    let (handle, shutdown) = spawn_health_monitor(Arc::clone(&shared), Duration::from_millis(30));

    // Healthy children are left alone.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 1);

    // Flip to unhealthy; the next probe crosses the threshold of one and
    // the supervisor restarts the child through the regular failure path.
    healthy.store(false, Ordering::SeqCst);
    let deadline = Instant::now() + Duration::from_secs(2);
    while starts.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        sleep(Duration::from_millis(10)).await;
    }
    assert!(starts.load(Ordering::SeqCst) >= 2);

    healthy.store(true, Ordering::SeqCst);
    let _ = shutdown.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn monitor_task_exits_when_monitoring_is_disabled() {
    let mut node = SupervisorNode::<Sensor, NoopMonitor<kestrel::SupervisionEvent>>::new(
        RestartStrategy::OneForOne,
        NoopMonitor::new(),
    );
    node.enable_health_checks(Duration::from_millis(20), Duration::from_millis(50), 3);

    let shared = Arc::new(Mutex::new(node));
    let (handle, _shutdown) = spawn_health_monitor(Arc::clone(&shared), Duration::from_millis(20));

    shared.lock().await.disable_health_checks();

    // The task notices on its next tick and stops on its own.
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor task should exit")
        .unwrap();
}
