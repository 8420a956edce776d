//! The supervised-unit contract and its runtime handle.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::types::{ChildHealth, ChildState};

/// Contract for anything a supervisor can run.
///
/// A child is started, optionally probed for health, and eventually stopped.
/// The supervisor owns the instance exclusively; a child never holds a
/// reference back to its supervisor, it only surfaces results through these
/// three methods.
#[async_trait]
pub trait Child: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Brings the child up. Must complete within the spec's start timeout.
    async fn start(&mut self) -> Result<(), Self::Error>;

    /// Brings the child down, ideally within `timeout`.
    async fn stop(&mut self, timeout: Duration) -> Result<(), Self::Error>;

    /// Probes the child. The default reports healthy, so only children with
    /// a meaningful probe need to implement this.
    async fn health_check(&self) -> ChildHealth {
        ChildHealth::Healthy
    }
}

/// Runtime handle pairing a child instance with its lifecycle state.
#[derive(Debug)]
pub struct ChildHandle<C> {
    instance: C,
    state: ChildState,
    restart_count: u32,
    last_restart: Option<Instant>,
}

impl<C> ChildHandle<C> {
    pub fn new(instance: C) -> Self {
        Self {
            instance,
            state: ChildState::Starting,
            restart_count: 0,
            last_restart: None,
        }
    }

    pub fn state(&self) -> ChildState {
        self.state
    }

    pub fn set_state(&mut self, state: ChildState) {
        self.state = state;
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn last_restart(&self) -> Option<Instant> {
        self.last_restart
    }

    /// Bumps the restart counter and stamps the restart time.
    pub fn record_restart(&mut self) {
        self.restart_count += 1;
        self.last_restart = Some(Instant::now());
    }

    /// Swaps in a freshly built instance, returning the old one.
    pub fn replace_instance(&mut self, instance: C) -> C {
        std::mem::replace(&mut self.instance, instance)
    }

    pub fn instance(&self) -> &C {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut C {
        &mut self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_starts_in_starting_state() {
        let handle = ChildHandle::new(());
        assert_eq!(handle.state(), ChildState::Starting);
        assert_eq!(handle.restart_count(), 0);
        assert!(handle.last_restart().is_none());
    }

    #[test]
    fn record_restart_updates_counter_and_timestamp() {
        let mut handle = ChildHandle::new(());
        handle.record_restart();
        handle.record_restart();
        assert_eq!(handle.restart_count(), 2);
        assert!(handle.last_restart().is_some());
    }

    #[test]
    fn replace_instance_returns_previous() {
        let mut handle = ChildHandle::new(1u32);
        let old = handle.replace_instance(2);
        assert_eq!(old, 1);
        assert_eq!(*handle.instance(), 2);
    }
}
