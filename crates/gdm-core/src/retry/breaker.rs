//! Circuit breaker shared by every job of a run.

use crate::sync::lock;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests flow normally.
    Closed,
    /// Too many consecutive failures; requests are refused until the recovery timeout elapses.
    Open,
    /// Recovery timeout elapsed; the next request is a trial.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Counts consecutive network failures across pages and jobs.
///
/// `threshold` failures in a row open the breaker; after `recovery` it becomes
/// half-open and the next success closes it, while the next failure re-opens it.
/// A threshold of 0 disables the breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    recovery: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery: Duration) -> Self {
        Self {
            threshold,
            recovery,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                open_until: None,
            }),
        }
    }

    /// Breaker that never opens.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Whether a request may go out now. Moves `Open` to `HalfOpen` once the
    /// recovery timeout has passed.
    pub fn allow(&self) -> bool {
        let mut inner = lock(&self.inner);
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let due = inner.open_until.map_or(true, |t| Instant::now() >= t);
                if due {
                    inner.state = BreakerState::HalfOpen;
                    tracing::info!("circuit breaker half-open, trying again");
                }
                due
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = lock(&self.inner);
        if inner.state == BreakerState::HalfOpen {
            tracing::info!("circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.open_until = None;
    }

    pub fn record_failure(&self) {
        if self.threshold == 0 {
            return;
        }
        let mut inner = lock(&self.inner);
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let trip = inner.state == BreakerState::HalfOpen
            || inner.consecutive_failures >= self.threshold;
        if trip && inner.state != BreakerState::Open {
            inner.state = BreakerState::Open;
            inner.open_until = Some(Instant::now() + self.recovery);
            tracing::warn!(
                failures = inner.consecutive_failures,
                recovery_secs = self.recovery.as_secs(),
                "circuit breaker opened"
            );
        }
    }

    /// Manual reset: an open breaker goes straight to half-open.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        if inner.state == BreakerState::Open {
            inner.state = BreakerState::HalfOpen;
            inner.open_until = None;
        }
    }

    pub fn state(&self) -> BreakerState {
        lock(&self.inner).state
    }

    pub fn is_open(&self) -> bool {
        self.state() == BreakerState::Open
    }
}
