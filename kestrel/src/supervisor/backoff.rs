//! Restart rate limiting with a sliding window and configurable delays.
//!
//! Every restart is stamped into a window of recent restart times. Entries
//! older than the window duration are pruned on access, so the counter
//! decays back toward zero on its own once failures stop; no explicit reset
//! is needed for recovery.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How the delay before the next start attempt is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffCurve {
    /// The same delay after every restart.
    Fixed(Duration),

    /// `min(base * multiplier^count, cap)` where `count` is the number of
    /// restarts currently inside the window.
    Exponential {
        base: Duration,
        multiplier: u32,
        cap: Duration,
    },
}

/// Per-child restart tracker.
#[derive(Debug, Clone)]
pub struct RestartBackoff {
    max_restarts: u32,
    window: Duration,
    curve: BackoffCurve,
    history: VecDeque<Instant>,
}

impl RestartBackoff {
    /// Creates a tracker with the default exponential curve
    /// (100ms base, doubling, 60s cap).
    pub fn new(max_restarts: u32, window: Duration) -> Self {
        Self::with_curve(
            max_restarts,
            window,
            BackoffCurve::Exponential {
                base: Duration::from_millis(100),
                multiplier: 2,
                cap: Duration::from_secs(60),
            },
        )
    }

    pub fn with_curve(max_restarts: u32, window: Duration, curve: BackoffCurve) -> Self {
        Self {
            max_restarts,
            window,
            curve,
            history: VecDeque::new(),
        }
    }

    /// Whether another restart is still within budget.
    ///
    /// Returns `false` once the in-window restart count has reached the
    /// configured maximum; that is the trigger for the restart-limit-exceeded
    /// condition.
    pub fn should_restart(&mut self) -> bool {
        self.prune();
        (self.history.len() as u32) < self.max_restarts
    }

    /// Records a restart at the current instant and returns the delay to
    /// wait before the next start attempt.
    pub fn record_restart(&mut self) -> Duration {
        self.history.push_back(Instant::now());
        self.prune();
        self.delay_for(self.history.len() as u32)
    }

    /// Number of restarts currently inside the window.
    pub fn restart_count(&mut self) -> u32 {
        self.prune();
        self.history.len() as u32
    }

    /// Clears all tracked restarts.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn delay_for(&self, count: u32) -> Duration {
        match self.curve {
            BackoffCurve::Fixed(delay) => delay,
            BackoffCurve::Exponential {
                base,
                multiplier,
                cap,
            } => {
                // Exponent capped to keep the multiplication from overflowing.
                let exponent = count.min(10);
                let factor = (multiplier as u64).saturating_pow(exponent);
                let millis = (base.as_millis() as u64).saturating_mul(factor);
                Duration::from_millis(millis).min(cap)
            }
        }
    }

    fn prune(&mut self) {
        let cutoff = Instant::now() - self.window;
        while let Some(&oldest) = self.history.front() {
            if oldest < cutoff {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for RestartBackoff {
    /// Five restarts per 60-second window.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn budget_exhausts_at_max_restarts() {
        let mut backoff = RestartBackoff::new(3, Duration::from_secs(60));

        assert!(backoff.should_restart());
        for _ in 0..3 {
            backoff.record_restart();
        }
        assert!(!backoff.should_restart());
        assert_eq!(backoff.restart_count(), 3);
    }

    #[test]
    fn exponential_delays_grow_and_cap() {
        let mut backoff = RestartBackoff::with_curve(
            20,
            Duration::from_secs(300),
            BackoffCurve::Exponential {
                base: Duration::from_millis(100),
                multiplier: 2,
                cap: Duration::from_secs(5),
            },
        );

        assert_eq!(backoff.record_restart(), Duration::from_millis(200));
        assert_eq!(backoff.record_restart(), Duration::from_millis(400));
        assert_eq!(backoff.record_restart(), Duration::from_millis(800));

        for _ in 0..10 {
            backoff.record_restart();
        }
        assert_eq!(backoff.record_restart(), Duration::from_secs(5));
    }

    #[test]
    fn fixed_curve_returns_constant_delay() {
        let mut backoff = RestartBackoff::with_curve(
            5,
            Duration::from_secs(60),
            BackoffCurve::Fixed(Duration::from_secs(1)),
        );

        assert_eq!(backoff.record_restart(), Duration::from_secs(1));
        assert_eq!(backoff.record_restart(), Duration::from_secs(1));
    }

    #[test]
    fn window_entries_expire() {
        let mut backoff = RestartBackoff::new(3, Duration::from_millis(80));

        backoff.record_restart();
        backoff.record_restart();
        assert_eq!(backoff.restart_count(), 2);

        thread::sleep(Duration::from_millis(120));

        assert_eq!(backoff.restart_count(), 0);
        assert!(backoff.should_restart());
    }

    #[test]
    fn count_decays_without_explicit_reset() {
        let mut backoff = RestartBackoff::new(2, Duration::from_millis(80));

        backoff.record_restart();
        backoff.record_restart();
        assert!(!backoff.should_restart());

        thread::sleep(Duration::from_millis(120));

        // A quiet window restores the full budget; the next failure counts
        // as restart #1 again.
        assert!(backoff.should_restart());
        backoff.record_restart();
        assert_eq!(backoff.restart_count(), 1);
    }

    #[test]
    fn sliding_window_keeps_recent_entries() {
        let mut backoff = RestartBackoff::new(3, Duration::from_millis(160));

        backoff.record_restart();
        backoff.record_restart();
        thread::sleep(Duration::from_millis(90));
        backoff.record_restart();
        thread::sleep(Duration::from_millis(90));

        // First two expired, the third is still inside the window.
        assert_eq!(backoff.restart_count(), 1);
    }

    #[test]
    fn reset_clears_history() {
        let mut backoff = RestartBackoff::default();
        backoff.record_restart();
        backoff.reset();
        assert_eq!(backoff.restart_count(), 0);
    }
}
