//! CircuitBreaker (spec §4.8): per-`<provider>_<action>` state machine
//! guarding Executor calls from hammering a consistently failing backend.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sai_core::{ErrorKind, Result, SaiError};

pub fn breaker_key(provider: &str, action: &str) -> String {
    format!("{provider}_{action}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    /// Only one probe call is admitted while half-open; further calls
    /// short-circuit until that probe resolves.
    HalfOpen { probe_in_flight: bool },
}

struct Entry {
    state: State,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

impl Entry {
    fn new() -> Self {
        Entry {
            state: State::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            opened_at: None,
        }
    }
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    cool_down: Duration,
    success_reset: u32,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreaker {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_reset: 2,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cool_down: Duration, success_reset: u32) -> Self {
        CircuitBreaker {
            failure_threshold,
            cool_down,
            success_reset,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Wrap a call guarded by the breaker for `key`. Short-circuits with
    /// `CircuitOpen` while open or when half-open already has a probe in
    /// flight.
    pub async fn call<F, Fut, T>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.admit(key) {
            return Err(SaiError::new(
                ErrorKind::CircuitOpen,
                format!("circuit breaker for '{key}' is open"),
            ));
        }

        let outcome = f().await;
        match &outcome {
            Ok(_) => self.record_success(key),
            Err(_) => self.record_failure(key),
        }
        outcome
    }

    /// Returns whether the call should proceed, transitioning `Open` →
    /// `HalfOpen` once the cool-down has elapsed.
    fn admit(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().expect("breaker lock poisoned");
        let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);
        match entry.state {
            State::Closed => true,
            State::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cool_down {
                    entry.state = State::HalfOpen { probe_in_flight: true };
                    entry.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
            State::HalfOpen { probe_in_flight } => {
                if probe_in_flight {
                    false
                } else {
                    entry.state = State::HalfOpen { probe_in_flight: true };
                    true
                }
            }
        }
    }

    fn record_success(&self, key: &str) {
        let mut entries = self.entries.lock().expect("breaker lock poisoned");
        let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);
        entry.consecutive_failures = 0;
        match entry.state {
            State::Closed => {}
            State::Open => {}
            State::HalfOpen { .. } => {
                entry.consecutive_successes += 1;
                if entry.consecutive_successes >= self.success_reset {
                    entry.state = State::Closed;
                    entry.consecutive_successes = 0;
                } else {
                    entry.state = State::HalfOpen { probe_in_flight: false };
                }
            }
        }
    }

    fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().expect("breaker lock poisoned");
        let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);
        match entry.state {
            State::Closed => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures >= self.failure_threshold {
                    entry.state = State::Open;
                    entry.opened_at = Some(Instant::now());
                }
            }
            State::Open => {}
            State::HalfOpen { .. } => {
                entry.state = State::Open;
                entry.opened_at = Some(Instant::now());
                entry.consecutive_successes = 0;
            }
        }
    }

    #[cfg(test)]
    fn is_open(&self, key: &str) -> bool {
        matches!(
            self.entries.lock().expect("breaker lock poisoned").get(key).map(|e| e.state),
            Some(State::Open)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn failing() -> Result<()> {
        Err(SaiError::new(ErrorKind::ExecutionFailed, "boom"))
    }

    async fn succeeding() -> Result<()> {
        Ok(())
    }

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30), 2);
        for _ in 0..3 {
            let _ = breaker.call("apt_install", failing).await;
        }
        assert!(breaker.is_open("apt_install"));
        let result = breaker.call("apt_install", succeeding).await;
        assert!(matches!(result, Err(ref e) if e.kind == ErrorKind::CircuitOpen));
    }

    #[tokio::test]
    async fn half_open_after_cool_down_closes_on_enough_successes() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10), 1);
        let _ = breaker.call("apt_install", failing).await;
        assert!(breaker.is_open("apt_install"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = breaker.call("apt_install", succeeding).await;
        assert!(result.is_ok());
        assert!(!breaker.is_open("apt_install"));
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10), 2);
        let _ = breaker.call("apt_install", failing).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = breaker.call("apt_install", failing).await;
        assert!(breaker.is_open("apt_install"));
    }

    #[test]
    fn breaker_key_formats_provider_and_action() {
        assert_eq!(breaker_key("apt", "install"), "apt_install");
    }
}
