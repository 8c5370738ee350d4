//! Per-source circuit breaker manager.
//!
//! One breaker guards each data source name. Consecutive failures above the
//! policy threshold open the breaker; a time-based cooldown promotes it to
//! half-open; the first successful probe closes it again and any half-open
//! failure re-opens it. State lives in a lock-striped map — only breaker
//! transitions are serialized, never the guarded adapter calls themselves.

use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

/// Error surfaced by [`BreakerManager::execute`].
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The breaker refused the call outright; the guarded operation never ran.
    Open { source: String },

    /// The guarded operation ran and failed; the failure was recorded.
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerError::Open { source } => {
                write!(f, "circuit breaker open for source {source}")
            }
            BreakerError::Inner(err) => write!(f, "{err}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BreakerError::Open { .. } => None,
            BreakerError::Inner(err) => err.source(),
        }
    }
}

/// Breaker tuning knobs.
#[derive(Debug, Clone)]
pub struct BreakerPolicy {
    /// Consecutive failures needed to open the breaker.
    pub failure_threshold: u32,
    /// How long an open breaker waits before allowing a half-open probe.
    pub cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed { consecutive_failures: u32 },
    Open { since: Instant },
    // A single probe is allowed through; concurrent callers are refused
    // until the probe settles.
    HalfOpen { probing: bool },
}

/// Manager holding one breaker per source name.
#[derive(Debug, Default)]
pub struct BreakerManager {
    policy: BreakerPolicy,
    states: DashMap<String, State>,
}

impl BreakerManager {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            policy,
            states: DashMap::new(),
        }
    }

    /// Run `op` under the breaker for `source`.
    ///
    /// Refuses with [`BreakerError::Open`] while the breaker is open or a
    /// half-open probe is already in flight. The guarded future is awaited
    /// outside any map lock.
    pub async fn execute<T, E, F, Fut>(&self, source: &str, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire(source)
            .map_err(|refused| BreakerError::Open {
                source: refused.source,
            })?;
        match op().await {
            Ok(value) => {
                self.record_success(source);
                Ok(value)
            }
            Err(err) => {
                self.record_failure(source);
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// The healthy predicate consulted by fan-out before any adapter call.
    pub fn is_healthy(&self, source: &str) -> bool {
        match self.states.get(source).map(|state| *state) {
            None | Some(State::Closed { .. }) => true,
            Some(State::HalfOpen { probing }) => !probing,
            Some(State::Open { since }) => since.elapsed() >= self.policy.cooldown,
        }
    }

    fn try_acquire(&self, source: &str) -> Result<(), Refused> {
        let mut state = self
            .states
            .entry(source.to_string())
            .or_insert(State::Closed {
                consecutive_failures: 0,
            });
        match *state {
            State::Closed { .. } => Ok(()),
            State::HalfOpen { probing: false } => {
                *state = State::HalfOpen { probing: true };
                Ok(())
            }
            State::HalfOpen { probing: true } => Err(Refused {
                source: source.to_string(),
            }),
            State::Open { since } => {
                if since.elapsed() >= self.policy.cooldown {
                    debug!(source, "breaker cooldown elapsed, allowing probe");
                    *state = State::HalfOpen { probing: true };
                    Ok(())
                } else {
                    Err(Refused {
                        source: source.to_string(),
                    })
                }
            }
        }
    }

    fn record_success(&self, source: &str) {
        if let Some(mut state) = self.states.get_mut(source) {
            if matches!(*state, State::HalfOpen { .. }) {
                debug!(source, "breaker probe succeeded, closing");
            }
            *state = State::Closed {
                consecutive_failures: 0,
            };
        }
    }

    fn record_failure(&self, source: &str) {
        let mut state = self
            .states
            .entry(source.to_string())
            .or_insert(State::Closed {
                consecutive_failures: 0,
            });
        *state = match *state {
            State::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.policy.failure_threshold {
                    warn!(source, failures, "breaker opening after consecutive failures");
                    State::Open {
                        since: Instant::now(),
                    }
                } else {
                    State::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            State::HalfOpen { .. } => {
                warn!(source, "breaker probe failed, re-opening");
                State::Open {
                    since: Instant::now(),
                }
            }
            open @ State::Open { .. } => open,
        };
    }
}

/// Internal refusal: the guarded operation was never started.
struct Refused {
    source: String,
}
