//! Circuit breaker for the upstream LLM dependency
//!
//! Classic three-state breaker: CLOSED passes calls through, OPEN rejects
//! them until the recovery timeout elapses, HALF_OPEN lets probes through and
//! closes again on the first recorded success. One instance guards one
//! circuit; the host creates it once and keeps it for the process lifetime.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::generator::FailureClass;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Category of a reported failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Error,
    Slow,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Error => "error",
            FailureKind::Slow => "slow",
        }
    }
}

/// Time source for the breaker; injectable so recovery is testable without
/// sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time source used in production
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: usize,
    /// How long the circuit stays open before a probe is allowed
    pub recovery_timeout: Duration,
    /// Successful calls slower than this are logged, not penalized
    pub slow_call_threshold: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            slow_call_threshold: Duration::from_secs(20),
        }
    }
}

/// Outcome of the pre-call gate check
#[derive(Debug, Clone)]
pub enum CallDecision {
    Allowed,
    Rejected {
        reason: String,
        retry_after: Duration,
    },
}

impl CallDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CallDecision::Allowed)
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: usize,
    success_count: u64,
    total_calls: u64,
    last_failure: Option<Instant>,
    timeout_failures: u64,
    error_failures: u64,
    slow_call_failures: u64,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            total_calls: 0,
            last_failure: None,
            timeout_failures: 0,
            error_failures: 0,
            slow_call_failures: 0,
        }
    }
}

/// Snapshot of breaker counters and state, for observability
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub state: BreakerState,
    pub failure_count: usize,
    pub success_count: u64,
    pub total_calls: u64,
    pub timeout_failures: u64,
    pub error_failures: u64,
    pub slow_call_failures: u64,
    pub seconds_since_last_failure: Option<f64>,
}

/// Error from the [`LlmCircuitBreaker::execute`] wrapper
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E: std::error::Error> {
    #[error("circuit breaker is open: {0}")]
    Open(String),

    #[error(transparent)]
    Call(E),
}

/// Circuit breaker guarding one remote-call circuit.
///
/// State transitions happen only in [`can_execute`](Self::can_execute)
/// (OPEN → HALF_OPEN) and in the `record_*` methods (HALF_OPEN → CLOSED,
/// any → OPEN). The breaker never raises; callers classify their own
/// operation errors and report them after the fact.
pub struct LlmCircuitBreaker {
    inner: Mutex<BreakerInner>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl LlmCircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(BreakerInner::new()),
            config,
            clock,
        }
    }

    /// Gate check before a call. Always counts the attempt.
    ///
    /// While OPEN, the call is rejected until the recovery timeout has
    /// elapsed since the last failure; once it has, the circuit moves to
    /// HALF_OPEN and the call is allowed as a probe. HALF_OPEN allows probes
    /// without a concurrency cap.
    pub fn can_execute(&self) -> CallDecision {
        let mut inner = self.inner.lock().unwrap();
        inner.total_calls += 1;

        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => CallDecision::Allowed,
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| self.clock.now().saturating_duration_since(t))
                    .unwrap_or(Duration::MAX);
                if elapsed > self.config.recovery_timeout {
                    inner.state = BreakerState::HalfOpen;
                    debug!("recovery timeout elapsed, probing upstream (half-open)");
                    CallDecision::Allowed
                } else {
                    let retry_after = self.config.recovery_timeout - elapsed;
                    CallDecision::Rejected {
                        reason: format!(
                            "circuit open, retry in {:.0}s",
                            retry_after.as_secs_f64().ceil()
                        ),
                        retry_after,
                    }
                }
            }
        }
    }

    /// Report a successful call.
    ///
    /// Closes the circuit when HALF_OPEN. A slow-but-successful call is
    /// logged but does not count toward the failure threshold; slowness is
    /// penalized only when the caller reports it via
    /// [`record_failure`](Self::record_failure).
    pub fn record_success(&self, response_time: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.success_count += 1;

        if inner.state == BreakerState::HalfOpen {
            inner.state = BreakerState::Closed;
            inner.failure_count = 0;
            info!("probe succeeded, circuit closed");
        }

        if response_time > self.config.slow_call_threshold {
            warn!(
                response_secs = response_time.as_secs_f64(),
                "slow call completed successfully"
            );
        }
    }

    /// Report a failed call. Opens the circuit at the failure threshold;
    /// idempotent when already open.
    pub fn record_failure(&self, kind: FailureKind, details: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count += 1;
        inner.last_failure = Some(self.clock.now());
        match kind {
            FailureKind::Timeout => inner.timeout_failures += 1,
            FailureKind::Error => inner.error_failures += 1,
            FailureKind::Slow => inner.slow_call_failures += 1,
        }

        if inner.failure_count >= self.config.failure_threshold
            && inner.state != BreakerState::Open
        {
            inner.state = BreakerState::Open;
            warn!(
                failures = inner.failure_count,
                kind = kind.as_str(),
                details,
                "failure threshold reached, circuit opened"
            );
        } else {
            debug!(
                failures = inner.failure_count,
                kind = kind.as_str(),
                details,
                "failure recorded"
            );
        }
    }

    /// Current state (no side effects)
    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    /// Snapshot of all counters and state (no side effects)
    pub fn get_status(&self) -> BreakerStatus {
        let inner = self.inner.lock().unwrap();
        BreakerStatus {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_calls: inner.total_calls,
            timeout_failures: inner.timeout_failures,
            error_failures: inner.error_failures,
            slow_call_failures: inner.slow_call_failures,
            seconds_since_last_failure: inner
                .last_failure
                .map(|t| self.clock.now().saturating_duration_since(t).as_secs_f64()),
        }
    }

    /// Convenience wrapper: gate, time, record, forward.
    ///
    /// The operation's error is classified through [`FailureClass`] before
    /// being reported, then handed back unchanged.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        E: std::error::Error + FailureClass,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.can_execute() {
            CallDecision::Rejected { reason, .. } => Err(BreakerError::Open(reason)),
            CallDecision::Allowed => {
                let start = self.clock.now();
                match op().await {
                    Ok(value) => {
                        self.record_success(self.clock.now().saturating_duration_since(start));
                        Ok(value)
                    }
                    Err(e) => {
                        self.record_failure(e.failure_kind(), &e.to_string());
                        Err(BreakerError::Call(e))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::generator::GeneratorError;

    /// Manually advanced clock for recovery-timeout tests
    struct ManualClock(Mutex<Instant>);

    impl ManualClock {
        fn new() -> Self {
            Self(Mutex::new(Instant::now()))
        }

        fn advance(&self, d: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += d;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    fn breaker_with_clock(threshold: usize) -> (LlmCircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout: Duration::from_secs(30),
            slow_call_threshold: Duration::from_secs(20),
        };
        let breaker = LlmCircuitBreaker::with_clock(config, clock.clone());
        (breaker, clock)
    }

    #[test]
    fn test_starts_closed_and_allows() {
        let breaker = LlmCircuitBreaker::new(CircuitBreakerConfig::default());
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.can_execute().is_allowed());
    }

    #[test]
    fn test_full_lifecycle() {
        let (breaker, clock) = breaker_with_clock(3);

        breaker.record_failure(FailureKind::Error, "upstream 500");
        breaker.record_failure(FailureKind::Timeout, "deadline exceeded");
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record_failure(FailureKind::Error, "upstream 500");
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.can_execute().is_allowed());

        // Past the recovery timeout the gate itself flips to half-open
        clock.advance(Duration::from_secs(31));
        assert!(breaker.can_execute().is_allowed());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_success(Duration::from_millis(200));
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.get_status().failure_count, 0);
    }

    #[test]
    fn test_rejection_reports_remaining_time() {
        let (breaker, clock) = breaker_with_clock(1);
        breaker.record_failure(FailureKind::Error, "boom");
        clock.advance(Duration::from_secs(10));

        match breaker.can_execute() {
            CallDecision::Rejected { reason, retry_after } => {
                assert!(reason.contains("circuit open"));
                assert_eq!(retry_after, Duration::from_secs(20));
            }
            CallDecision::Allowed => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_probe_failure_keeps_circuit_open() {
        let (breaker, clock) = breaker_with_clock(1);
        breaker.record_failure(FailureKind::Error, "boom");
        clock.advance(Duration::from_secs(31));
        assert!(breaker.can_execute().is_allowed());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_failure(FailureKind::Error, "still down");
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.can_execute().is_allowed());
    }

    #[test]
    fn test_open_is_idempotent_under_more_failures() {
        let (breaker, _clock) = breaker_with_clock(2);
        for _ in 0..5 {
            breaker.record_failure(FailureKind::Error, "boom");
        }
        let status = breaker.get_status();
        assert_eq!(status.state, BreakerState::Open);
        assert_eq!(status.failure_count, 5);
    }

    #[test]
    fn test_slow_success_does_not_trip_breaker() {
        let (breaker, _clock) = breaker_with_clock(1);
        breaker.record_success(Duration::from_secs(25));
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.get_status().failure_count, 0);
    }

    #[test]
    fn test_success_in_closed_does_not_reset_failure_count() {
        let (breaker, _clock) = breaker_with_clock(3);
        breaker.record_failure(FailureKind::Error, "boom");
        breaker.record_success(Duration::from_millis(50));
        // Only the HALF_OPEN -> CLOSED transition resets the count
        assert_eq!(breaker.get_status().failure_count, 1);
    }

    #[test]
    fn test_per_kind_counters_and_total_calls() {
        let (breaker, _clock) = breaker_with_clock(10);
        breaker.record_failure(FailureKind::Timeout, "t");
        breaker.record_failure(FailureKind::Error, "e");
        breaker.record_failure(FailureKind::Slow, "s");
        breaker.can_execute();
        breaker.can_execute();

        let status = breaker.get_status();
        assert_eq!(status.timeout_failures, 1);
        assert_eq!(status.error_failures, 1);
        assert_eq!(status.slow_call_failures, 1);
        assert_eq!(status.total_calls, 2);
        assert!(status.seconds_since_last_failure.is_some());
    }

    #[tokio::test]
    async fn test_execute_wrapper_records_and_forwards() {
        let (breaker, _clock) = breaker_with_clock(2);

        let ok: Result<&str, BreakerError<GeneratorError>> =
            breaker.execute(|| async { Ok("fine") }).await;
        assert_eq!(ok.unwrap(), "fine");
        assert_eq!(breaker.get_status().success_count, 1);

        for _ in 0..2 {
            let err: Result<&str, BreakerError<GeneratorError>> = breaker
                .execute(|| async { Err(GeneratorError::Timeout("30s".to_string())) })
                .await;
            assert!(matches!(err, Err(BreakerError::Call(_))));
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(breaker.get_status().timeout_failures, 2);

        let rejected: Result<&str, BreakerError<GeneratorError>> =
            breaker.execute(|| async { Ok("unreachable") }).await;
        assert!(matches!(rejected, Err(BreakerError::Open(_))));
    }
}
