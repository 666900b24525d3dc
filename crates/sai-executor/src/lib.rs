//! Executor, CircuitBreaker and Recovery (spec §4.7, §4.8).

pub mod circuit_breaker;
pub mod executor;
pub mod recovery;

pub use circuit_breaker::{breaker_key, CircuitBreaker};
pub use executor::{can_execute, dry_run, execute, run_one, ExecutionOptions};
pub use recovery::{backoff_delay, recover, RecoveryOutcome, RecoveryStrategy, DEFAULT_MAX_ATTEMPTS};
