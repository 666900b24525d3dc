//! Recovery (spec §4.8): ordered fallback strategies tried after a
//! `recoverable` execution failure, each bounded by `max_attempts` with
//! exponential backoff. The strategy callbacks themselves are supplied
//! by the caller (sai-orchestrator), which is the layer that knows how
//! to pick an alternate provider or refresh saidata; this crate owns
//! only the ordering, bounding and backoff.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use sai_core::{ActionResult, SaiError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 10_000;

pub fn backoff_delay(attempt: u32) -> Duration {
    let millis = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
    Duration::from_millis(millis.min(BACKOFF_CAP_MS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    Retry,
    AlternateProvider,
    RefreshSaidata,
    SkipOptionalStep,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryStrategy::Retry => "retry",
            RecoveryStrategy::AlternateProvider => "alternate_provider",
            RecoveryStrategy::RefreshSaidata => "refresh_saidata",
            RecoveryStrategy::SkipOptionalStep => "skip_optional_step",
        };
        write!(f, "{s}")
    }
}

pub const RECOVERY_ORDER: [RecoveryStrategy; 4] = [
    RecoveryStrategy::Retry,
    RecoveryStrategy::AlternateProvider,
    RecoveryStrategy::RefreshSaidata,
    RecoveryStrategy::SkipOptionalStep,
];

pub struct RecoveryOutcome {
    pub strategy: RecoveryStrategy,
    pub result: ActionResult,
}

/// Drive the strategy list in order. `attempt(strategy, attempt_number)`
/// returns `None` when that strategy isn't applicable to the failure at
/// hand (e.g. no alternate provider exists) — the driver moves on to the
/// next strategy without spending further attempts on it. A `Some`
/// carrying a failed `ActionResult` still counts as a consumed attempt
/// and is retried (with backoff) up to `max_attempts` before moving on.
pub async fn recover<F, Fut>(
    error: &SaiError,
    max_attempts: u32,
    mut attempt: F,
) -> Option<RecoveryOutcome>
where
    F: FnMut(RecoveryStrategy, u32) -> Fut,
    Fut: Future<Output = Option<ActionResult>>,
{
    if !error.recoverable {
        return None;
    }

    for strategy in RECOVERY_ORDER {
        for n in 1..=max_attempts {
            let Some(result) = attempt(strategy, n).await else {
                break;
            };
            if result.success {
                return Some(RecoveryOutcome { strategy, result });
            }
            if n < max_attempts {
                tokio::time::sleep(backoff_delay(n)).await;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn recoverable_error() -> SaiError {
        SaiError::new(ErrorKind::ExecutionFailed, "transient").recoverable(true)
    }

    fn ok_result() -> ActionResult {
        ActionResult {
            action: "install".to_string(),
            software: "nginx".to_string(),
            provider: "apt".to_string(),
            success: true,
            error: None,
            output: String::new(),
            commands: Vec::new(),
            exit_code: 0,
            duration: Duration::default(),
            required_confirmation: false,
            changes: Vec::new(),
            recovered_via: None,
        }
    }

    fn failing_result() -> ActionResult {
        let mut r = ok_result();
        r.success = false;
        r
    }

    #[tokio::test]
    async fn non_recoverable_error_skips_recovery_entirely() {
        let error = SaiError::new(ErrorKind::ActionNotSupported, "nope");
        let outcome = recover(&error, 3, |_, _| async { Some(ok_result()) }).await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn first_successful_strategy_short_circuits() {
        let error = recoverable_error();
        let calls = AtomicU32::new(0);
        let outcome = recover(&error, 3, |strategy, _attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if strategy == RecoveryStrategy::Retry {
                    Some(ok_result())
                } else {
                    None
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome.strategy, RecoveryStrategy::Retry);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_through_to_later_strategy_when_earlier_inapplicable() {
        let error = recoverable_error();
        let outcome = recover(&error, 1, |strategy, _attempt| async move {
            match strategy {
                RecoveryStrategy::Retry => None,
                RecoveryStrategy::AlternateProvider => Some(ok_result()),
                _ => None,
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome.strategy, RecoveryStrategy::AlternateProvider);
    }

    #[tokio::test]
    async fn exhausts_all_strategies_and_returns_none() {
        let error = recoverable_error();
        let outcome = recover(&error, 1, |_, _| async { Some(failing_result()) }).await;
        assert!(outcome.is_none());
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(20), Duration::from_millis(10_000));
    }
}
