//! Event families recorded by the supervision engine and the routing bus.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use kestrel_api::monitor::{EventSeverity, MonitoringEvent};

/// Event emitted by a supervisor about itself or one of its children.
#[derive(Debug, Clone, Serialize)]
pub struct SupervisionEvent {
    /// When the event occurred.
    #[serde(skip)]
    pub timestamp: SystemTime,

    /// Id of the emitting supervisor.
    pub supervisor_id: String,

    /// Id of the affected child, when the event concerns one.
    pub child_id: Option<String>,

    /// What happened.
    pub kind: SupervisionEventKind,

    /// Free-form context.
    pub metadata: HashMap<String, String>,
}

impl SupervisionEvent {
    /// Creates an event stamped with the current time.
    pub fn now(
        supervisor_id: impl Into<String>,
        child_id: Option<String>,
        kind: SupervisionEventKind,
    ) -> Self {
        Self {
            timestamp: SystemTime::now(),
            supervisor_id: supervisor_id.into(),
            child_id,
            kind,
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl MonitoringEvent for SupervisionEvent {
    const EVENT_TYPE: &'static str = "supervision";

    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            SupervisionEventKind::ChildStarted => EventSeverity::Info,
            SupervisionEventKind::ChildStopped => EventSeverity::Info,
            SupervisionEventKind::ChildFailed { .. } => EventSeverity::Error,
            SupervisionEventKind::ChildRestarted { .. } => EventSeverity::Warning,
            SupervisionEventKind::RestartLimitExceeded { .. } => EventSeverity::Critical,
            SupervisionEventKind::StrategyApplied { .. } => EventSeverity::Info,
        }
    }
}

/// Specific supervision event kinds.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SupervisionEventKind {
    /// Child reached the running state.
    ChildStarted,

    /// Child was deliberately stopped.
    ChildStopped,

    /// Child failed with an error (crash or failed health probe).
    ChildFailed { error: String, restart_count: u32 },

    /// Child was restarted after a failure.
    ChildRestarted { restart_count: u32 },

    /// Child exhausted its restart budget and is permanently failed.
    RestartLimitExceeded {
        restart_count: u32,
        #[serde(skip)]
        window: Duration,
    },

    /// A restart strategy was applied after a failure.
    StrategyApplied {
        strategy: String,
        affected_count: usize,
    },
}

/// Event emitted by the bus/router about message flow.
#[derive(Debug, Clone, Serialize)]
pub struct BusEvent {
    #[serde(skip)]
    pub timestamp: SystemTime,

    /// What happened.
    pub kind: BusEventKind,

    /// Display form of the affected address, when known.
    pub address: Option<String>,
}

impl BusEvent {
    pub fn now(kind: BusEventKind, address: Option<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            kind,
            address,
        }
    }
}

impl MonitoringEvent for BusEvent {
    const EVENT_TYPE: &'static str = "bus";

    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            BusEventKind::Delivered => EventSeverity::Trace,
            BusEventKind::Expired => EventSeverity::Debug,
            BusEventKind::UnknownRecipient => EventSeverity::Warning,
            BusEventKind::MailboxClosed => EventSeverity::Warning,
        }
    }
}

/// Specific bus event kinds.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type")]
pub enum BusEventKind {
    /// Envelope was forwarded into the recipient's mailbox.
    Delivered,

    /// Envelope outlived its TTL and was dropped.
    Expired,

    /// No registry entry for the recipient address.
    UnknownRecipient,

    /// Recipient resolved but its mailbox no longer accepts messages.
    MailboxClosed,
}
