//! # Monitoring Sink Contract
//!
//! Supervisors and the bus report structured events through a single
//! `record` operation. The contract is deliberately narrow:
//!
//! - `record` is synchronous and fire-and-forget
//! - it never blocks the caller
//! - it cannot fail the calling operation
//!
//! The [`NoopMonitor`] is the zero-overhead default; richer sinks (in-memory
//! history, log forwarding) live in the runtime crate.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::SystemTime;

use serde::Serialize;

/// Severity attached to every monitoring event, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EventSeverity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Contract for event types flowing into a monitor.
pub trait MonitoringEvent: Debug + Clone + Send + Sync + 'static {
    /// Stable event family name, e.g. `"supervision"` or `"bus"`.
    const EVENT_TYPE: &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> SystemTime;

    /// Severity used by filtering sinks.
    fn severity(&self) -> EventSeverity;
}

/// Fire-and-forget event sink.
///
/// Implementations must return promptly and must not propagate their own
/// failures to the caller; a monitor that cannot record an event drops it.
pub trait Monitor<E: MonitoringEvent>: Send + Sync + Clone + 'static {
    /// Records one event.
    fn record(&self, event: E);
}

/// Monitor that discards every event.
///
/// The default sink when observability is not wired up; `record` compiles to
/// nothing.
#[derive(Debug)]
pub struct NoopMonitor<E> {
    _marker: PhantomData<fn(E)>,
}

impl<E> NoopMonitor<E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E> Default for NoopMonitor<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for NoopMonitor<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E: MonitoringEvent> Monitor<E> for NoopMonitor<E> {
    fn record(&self, _event: E) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestEvent {
        at: SystemTime,
        severity: EventSeverity,
    }

    impl MonitoringEvent for TestEvent {
        const EVENT_TYPE: &'static str = "test";

        fn timestamp(&self) -> SystemTime {
            self.at
        }

        fn severity(&self) -> EventSeverity {
            self.severity
        }
    }

    #[test]
    fn severity_ordering_supports_filtering() {
        assert!(EventSeverity::Critical > EventSeverity::Error);
        assert!(EventSeverity::Error > EventSeverity::Warning);
        assert!(EventSeverity::Warning > EventSeverity::Info);
        assert!(EventSeverity::Info > EventSeverity::Debug);
        assert!(EventSeverity::Debug > EventSeverity::Trace);
    }

    #[test]
    fn noop_monitor_accepts_events() {
        let monitor = NoopMonitor::new();
        monitor.record(TestEvent {
            at: SystemTime::now(),
            severity: EventSeverity::Info,
        });
        // Cloning shares nothing; both are zero-sized.
        let clone = monitor.clone();
        clone.record(TestEvent {
            at: SystemTime::now(),
            severity: EventSeverity::Critical,
        });
    }
}
