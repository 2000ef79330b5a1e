//! Circuit breaker guarding exchange calls.
//!
//! - **Closed**: calls flow; consecutive transient failures are counted
//! - **Open**: calls fail fast until the reset timeout elapses
//! - **HalfOpen**: a single probe is let through; its outcome closes or
//!   re-opens the circuit
//!
//! Only failures the caller classifies as transient are counted. A well-formed
//! rejection from the exchange means the exchange is up.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time spent open before a probe is allowed
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    /// Whether a call may proceed now. Moves Open to HalfOpen once the reset
    /// timeout has elapsed and claims the single probe slot.
    pub async fn try_acquire(&self) -> bool {
        let mut s = self.state.lock().await;
        match s.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = s
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.reset_timeout)
                    .unwrap_or(true);
                if elapsed {
                    info!("Circuit '{}' half-open, sending probe", self.name);
                    s.state = CircuitState::HalfOpen;
                    s.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if s.probe_in_flight {
                    false
                } else {
                    s.probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub async fn on_success(&self) {
        let mut s = self.state.lock().await;
        if s.state != CircuitState::Closed {
            info!("Circuit '{}' closed", self.name);
        }
        s.state = CircuitState::Closed;
        s.consecutive_failures = 0;
        s.opened_at = None;
        s.probe_in_flight = false;
    }

    pub async fn on_failure(&self) {
        let mut s = self.state.lock().await;
        s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        s.probe_in_flight = false;

        let trip = match s.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => s.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            warn!(
                "Circuit '{}' opened after {} consecutive failures",
                self.name, s.consecutive_failures
            );
            s.state = CircuitState::Open;
            s.opened_at = Some(Instant::now());
        }
    }

    /// Run `f` under the breaker. `counts_as_failure` decides which errors
    /// trip the circuit; other errors count as a healthy round trip.
    pub async fn call<F, Fut, T, E>(
        &self,
        f: F,
        counts_as_failure: impl Fn(&E) -> bool,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.try_acquire().await {
            return Err(CircuitBreakerError::Open);
        }

        match f().await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(e) => {
                if counts_as_failure(&e) {
                    self.on_failure().await;
                } else {
                    self.on_success().await;
                }
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    Open,
    Inner(E),
}
