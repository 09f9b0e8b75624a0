//! Circuit Breaker — spec §4.7.
//!
//! A per-downstream-collaborator closed/open state machine guarding the
//! admission pipeline's Dispatch stage. Grounded on the original Python
//! reference's `CircuitBreaker` stub (`middleware.py`) for the state
//! machine shape (closed → open on N consecutive failures, open → closed
//! only after a successful probe call past the recovery window), and on
//! the teacher's atomic/mutex shared-state idiom (`jwks_bearer`'s
//! `AtomicBool` refresh debounce, `worker_pool.rs`'s `AtomicU64` counters)
//! for the Rust implementation.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;

/// Whether a call may currently proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected,
}

/// Closed/open breaker with a consecutive-failure threshold and a recovery
/// window. There is no explicit "half-open" state tracked separately: once
/// the recovery window has elapsed, the next call is admitted as a probe —
/// if it fails, the breaker stays open and the window restarts; if it
/// succeeds, the breaker closes (spec §3 invariant 4: "open → closed only
/// via a post-recovery success").
pub struct CircuitBreaker {
    threshold: u32,
    recovery: Duration,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery: Duration) -> Self {
        Self {
            threshold,
            recovery,
            state: AtomicU8::new(STATE_CLOSED),
            consecutive_failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    /// Decide whether to admit the next call (spec §4.6's Guard stage).
    #[allow(clippy::unwrap_used)] // poisoned-mutex recovery below is unreachable in practice
    pub fn admit(&self) -> Admission {
        if self.state.load(Ordering::Acquire) == STATE_CLOSED {
            return Admission::Allowed;
        }
        let opened_at = *self.opened_at.lock().unwrap_or_else(|e| e.into_inner());
        match opened_at {
            Some(t) if t.elapsed() >= self.recovery => Admission::Allowed,
            _ => Admission::Rejected,
        }
    }

    /// Record a successful dispatch: closes the breaker if it was open.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        if self
            .state
            .swap(STATE_CLOSED, Ordering::AcqRel)
            == STATE_OPEN
        {
            info!("circuit breaker closed after successful probe");
        }
    }

    /// Record a failed dispatch: opens the breaker once the threshold is hit.
    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.threshold {
            let was_closed = self.state.swap(STATE_OPEN, Ordering::AcqRel) == STATE_CLOSED;
            #[allow(clippy::unwrap_used)]
            {
                *self.opened_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
            }
            if was_closed {
                warn!(failures, threshold = self.threshold, "circuit breaker opened");
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_OPEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_breaker_admits() {
        let b = CircuitBreaker::new(3, Duration::from_secs(30));
        assert_eq!(b.admit(), Admission::Allowed);
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let b = CircuitBreaker::new(3, Duration::from_secs(30));
        b.record_failure();
        b.record_failure();
        assert_eq!(b.admit(), Admission::Allowed, "below threshold, still closed");
        b.record_failure();
        assert!(b.is_open());
        assert_eq!(b.admit(), Admission::Rejected);
    }

    #[test]
    fn success_resets_failure_count_without_opening() {
        let b = CircuitBreaker::new(3, Duration::from_secs(30));
        b.record_failure();
        b.record_failure();
        b.record_success();
        b.record_failure();
        b.record_failure();
        assert!(!b.is_open(), "counter should have reset on success");
    }

    #[test]
    fn recovers_after_window_elapses_on_success() {
        let b = CircuitBreaker::new(1, Duration::from_millis(10));
        b.record_failure();
        assert!(b.is_open());
        assert_eq!(b.admit(), Admission::Rejected);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(b.admit(), Admission::Allowed, "probe call should be admitted");
        b.record_success();
        assert!(!b.is_open());
    }

    #[test]
    fn failed_probe_keeps_breaker_open() {
        let b = CircuitBreaker::new(1, Duration::from_millis(10));
        b.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(b.admit(), Admission::Allowed);
        b.record_failure();
        assert!(b.is_open());
        assert_eq!(b.admit(), Admission::Rejected, "recovery window restarted");
    }
}
