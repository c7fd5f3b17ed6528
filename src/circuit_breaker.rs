//! # Circuit Breaker Module
//!
//! Protects verification latency from a failing semantic engine. After
//! repeated failures requests skip the engine entirely and go straight to the
//! fuzzy fallback matcher until the reset timeout elapses.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::ocr_config::RecoveryConfig;

/// Circuit breaker for semantic engine calls
///
/// ## State Machine
///
/// ```text
/// CLOSED ────failures ≥ threshold────► OPEN
///    ▲                                   │
///    │                              reset timeout
///    │                                   ▼
///    └──────────success────────── HALF-OPEN ───failure───► OPEN
/// ```
///
/// - **CLOSED → OPEN**: failure count reaches `circuit_breaker_threshold`
/// - **OPEN → HALF-OPEN**: `circuit_breaker_reset_secs` have elapsed since the last failure
/// - **HALF-OPEN**: [`try_acquire`](Self::try_acquire) admits one trial call per reset window
/// - **HALF-OPEN → CLOSED**: the trial call succeeds
/// - **HALF-OPEN → OPEN**: the trial call fails
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
    trial_started: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use price_tag_verifier::ocr_config::RecoveryConfig;
    /// use price_tag_verifier::circuit_breaker::CircuitBreaker;
    ///
    /// let breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold,
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    /// Check if circuit breaker is open (blocking requests)
    ///
    /// Once the reset timeout has elapsed the failure count is kept, so a
    /// single further failure reopens the circuit immediately (half-open).
    pub fn is_open(&self) -> bool {
        let state = self.state.lock();
        if state.failure_count < self.threshold {
            return false;
        }
        match state.last_failure_time {
            Some(last) => last.elapsed() < self.reset_after,
            None => false,
        }
    }

    /// Claims permission for one semantic call.
    ///
    /// Always granted while closed and never while open. In half-open only the
    /// first caller gets through; a trial that never reports back is replaced
    /// after another reset window.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.failure_count < self.threshold {
            return true;
        }
        let now = Instant::now();
        if let Some(last) = state.last_failure_time {
            if now.duration_since(last) < self.reset_after {
                return false;
            }
        }
        match state.trial_started {
            Some(started) if now.duration_since(started) < self.reset_after => false,
            _ => {
                state.trial_started = Some(now);
                true
            }
        }
    }

    /// Record a failed semantic call
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(Instant::now());
        state.trial_started = None;
        let open = state.failure_count >= self.threshold;
        drop(state);
        crate::observability::update_circuit_breaker_state(open);
    }

    /// Record a successful semantic call, closing the circuit
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        let was_failing = state.failure_count > 0;
        *state = BreakerState::default();
        drop(state);
        if was_failing {
            crate::observability::update_circuit_breaker_state(false);
        }
    }

    /// Consecutive failures recorded so far
    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, reset_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(&RecoveryConfig {
            circuit_breaker_threshold: threshold,
            circuit_breaker_reset_secs: reset_secs,
            ..RecoveryConfig::default()
        })
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = breaker(3, 60);
        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes() {
        let breaker = breaker(1, 60);
        breaker.record_failure();
        assert!(breaker.is_open());
        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    fn expired(breaker: &CircuitBreaker) {
        let mut state = breaker.state.lock();
        state.last_failure_time = Instant::now().checked_sub(Duration::from_secs(120));
    }

    #[test]
    fn test_half_open_admits_single_trial() {
        let breaker = breaker(1, 60);
        breaker.record_failure();
        assert!(!breaker.try_acquire());

        expired(&breaker);
        assert!(breaker.try_acquire());
        assert!(!breaker.try_acquire());
        assert!(!breaker.try_acquire());

        breaker.record_success();
        assert!(breaker.try_acquire());
        assert!(breaker.try_acquire());
    }

    #[test]
    fn test_failed_trial_reopens() {
        let breaker = breaker(1, 60);
        breaker.record_failure();
        expired(&breaker);
        assert!(breaker.try_acquire());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn test_half_open_after_reset_timeout() {
        let breaker = CircuitBreaker {
            state: Mutex::new(BreakerState::default()),
            threshold: 1,
            reset_after: Duration::from_millis(0),
        };
        breaker.record_failure();
        // reset window of zero lets the next call through
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 1);
    }
}
