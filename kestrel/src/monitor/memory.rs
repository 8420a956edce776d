//! In-memory monitoring sink with bounded history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;

use kestrel_api::monitor::{EventSeverity, Monitor, MonitoringEvent};

/// Configuration for the in-memory monitor.
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Maximum number of events retained in history.
    pub max_history: usize,

    /// Events below this severity are counted but not stored.
    pub severity_filter: EventSeverity,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            max_history: 1000,
            severity_filter: EventSeverity::Trace,
        }
    }
}

/// Point-in-time view of recorded events.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringSnapshot<E: MonitoringEvent + Serialize> {
    #[serde(skip)]
    pub taken_at: SystemTime,
    pub total_events: u64,
    pub warning_count: u64,
    pub error_count: u64,
    pub critical_count: u64,
    pub recent_events: Vec<E>,
}

/// Monitor keeping a bounded ring of recent events plus severity counters.
///
/// `record` takes a short mutex-protected push; it never suspends and never
/// fails the caller. Intended for tests and runtime introspection, not as a
/// durable event store.
pub struct InMemoryMonitor<E> {
    inner: Arc<MonitorInner<E>>,
}

struct MonitorInner<E> {
    config: MonitoringConfig,
    history: Mutex<VecDeque<E>>,
    total: AtomicU64,
    warnings: AtomicU64,
    errors: AtomicU64,
    criticals: AtomicU64,
}

impl<E: MonitoringEvent> InMemoryMonitor<E> {
    pub fn new(config: MonitoringConfig) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                config,
                history: Mutex::new(VecDeque::new()),
                total: AtomicU64::new(0),
                warnings: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                criticals: AtomicU64::new(0),
            }),
        }
    }

    /// Total number of events recorded, including filtered ones.
    pub fn total_events(&self) -> u64 {
        self.inner.total.load(Ordering::Relaxed)
    }

    /// Events currently held in history.
    pub fn history_len(&self) -> usize {
        self.inner.history.lock().len()
    }

    /// Returns all retained events, oldest first.
    pub fn events(&self) -> Vec<E> {
        self.inner.history.lock().iter().cloned().collect()
    }
}

impl<E: MonitoringEvent + Serialize> InMemoryMonitor<E> {
    /// Takes a snapshot of counters and retained history.
    pub fn snapshot(&self) -> MonitoringSnapshot<E> {
        MonitoringSnapshot {
            taken_at: SystemTime::now(),
            total_events: self.inner.total.load(Ordering::Relaxed),
            warning_count: self.inner.warnings.load(Ordering::Relaxed),
            error_count: self.inner.errors.load(Ordering::Relaxed),
            critical_count: self.inner.criticals.load(Ordering::Relaxed),
            recent_events: self.events(),
        }
    }
}

impl<E: MonitoringEvent> Default for InMemoryMonitor<E> {
    fn default() -> Self {
        Self::new(MonitoringConfig::default())
    }
}

impl<E> Clone for InMemoryMonitor<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: MonitoringEvent> Monitor<E> for InMemoryMonitor<E> {
    fn record(&self, event: E) {
        self.inner.total.fetch_add(1, Ordering::Relaxed);
        match event.severity() {
            EventSeverity::Warning => {
                self.inner.warnings.fetch_add(1, Ordering::Relaxed);
            }
            EventSeverity::Error => {
                self.inner.errors.fetch_add(1, Ordering::Relaxed);
            }
            EventSeverity::Critical => {
                self.inner.criticals.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        if event.severity() < self.inner.config.severity_filter {
            return;
        }

        let mut history = self.inner.history.lock();
        if history.len() == self.inner.config.max_history {
            history.pop_front();
        }
        history.push_back(event);
    }
}
