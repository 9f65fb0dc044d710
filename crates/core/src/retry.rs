//! Retry policy executor
//!
//! [`Retrier`] runs a fallible operation under a [`RetryPolicy`]: up to
//! `max_attempts` calls, sleeping between failed attempts with exponential
//! backoff capped at `max_delay`. Errors matching an exclusion are permanent
//! and stop the loop immediately.
//!
//! Exclusions match anywhere in the error's `source()` chain, so an excluded
//! condition is recognised even after it has been wrapped with context.
//!
//! The inter-attempt delay blocks the calling thread. The context is checked
//! before every attempt; a cancelled or expired context ends the loop with
//! the corresponding error instead of sleeping on.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{Error, ErrorKind};

/// Retry policy
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy {
///     max_attempts: 5,
///     start_delay_ms: 10,
///     max_delay_ms: Some(200),
///     backoff_coefficient: 2.0,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    /// Upper bound for the delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: Option<u64>,
    /// Multiplier applied to the delay after each failed attempt
    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_start_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> Option<u64> {
    Some(10_000)
}

fn default_backoff_coefficient() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            start_delay_ms: default_start_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_coefficient: default_backoff_coefficient(),
        }
    }
}

impl RetryPolicy {
    /// Policy that runs the operation exactly once
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial delay
    pub fn with_start_delay_ms(mut self, start_delay_ms: u64) -> Self {
        self.start_delay_ms = start_delay_ms;
        self
    }

    /// Set (or clear) the delay cap
    pub fn with_max_delay_ms(mut self, max_delay_ms: Option<u64>) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Delay that follows `delay`, after backoff and capping
    pub(crate) fn next_delay(&self, delay: Duration) -> Duration {
        let coefficient = if self.backoff_coefficient.is_finite() && self.backoff_coefficient > 0.0 {
            self.backoff_coefficient
        } else {
            1.0
        };
        let nanos = (delay.as_nanos() as f64 * coefficient).round();
        let next = if nanos >= u64::MAX as f64 {
            Duration::MAX
        } else {
            Duration::from_nanos(nanos as u64)
        };
        match self.max_delay_ms {
            Some(max) => next.min(Duration::from_millis(max)),
            None => next,
        }
    }
}

/// Blocking wait between attempts
pub trait Sleeper: Send + Sync {
    /// Block for `duration`
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

type Exclusion = Box<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;

/// Bounded exponential-backoff retry executor
pub struct Retrier {
    policy: RetryPolicy,
    excluded: Vec<Exclusion>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for Retrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrier")
            .field("policy", &self.policy)
            .field("excluded", &self.excluded.len())
            .finish()
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Retrier {
    /// Retrier with the default policy and no exclusions
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            excluded: Vec::new(),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Treat errors of type `E` matching `predicate` as permanent
    pub fn exclude<E, P>(mut self, predicate: P) -> Self
    where
        E: StdError + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.excluded.push(Box::new(move |err: &(dyn StdError + 'static)| {
            err.downcast_ref::<E>().map_or(false, &predicate)
        }));
        self
    }

    /// Treat client errors of the given kinds as permanent
    pub fn exclude_kinds(self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        let kinds: Vec<ErrorKind> = kinds.into_iter().collect();
        self.exclude::<Error, _>(move |e| kinds.contains(&e.kind()))
    }

    /// Active policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn is_excluded(&self, err: &(dyn StdError + 'static)) -> bool {
        let mut current = Some(err);
        while let Some(e) = current {
            if self.excluded.iter().any(|matches| matches(e)) {
                return true;
            }
            current = e.source();
        }
        false
    }

    /// Run `f` under the policy
    ///
    /// Returns the first success, the first excluded error, or the last
    /// error once every attempt has failed.
    pub fn wrap<T, E, F>(&self, ctx: &Context, name: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: StdError + From<Error> + 'static,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.start_delay();
        let mut attempt = 1;

        loop {
            ctx.check()?;
            tracing::debug!(method = "retrier", name, attempt, "start execution");

            let err = match f() {
                Ok(value) => {
                    tracing::debug!(method = "retrier", name, attempt, "execution finished");
                    return Ok(value);
                }
                Err(e) if self.is_excluded(&e) => return Err(e),
                Err(e) => e,
            };
            tracing::warn!(method = "retrier", name, attempt, error = %err, "error occurred during execution");

            if attempt >= attempts {
                return Err(err);
            }
            self.sleeper.sleep(delay);
            delay = self.policy.next_delay(delay);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        slept: Mutex<Vec<Duration>>,
    }

    impl Sleeper for Recorder {
        fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn policy(attempts: u32, start: u64, max: Option<u64>) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts,
            start_delay_ms: start,
            max_delay_ms: max,
            backoff_coefficient: 2.0,
        }
    }

    fn retrier(policy: RetryPolicy) -> (Retrier, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let r = Retrier::new()
            .with_policy(policy)
            .with_sleeper(recorder.clone());
        (r, recorder)
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.start_delay_ms, 1000);
        assert_eq!(p.max_delay_ms, Some(10_000));
        assert_eq!(p.backoff_coefficient, 2.0);
    }

    #[test]
    fn test_fails_twice_then_succeeds() {
        let (r, recorder) = retrier(policy(3, 1, None));
        let calls = Cell::new(0);

        let result: Result<u32, Error> = r.wrap(&Context::background(), "flaky", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Error::backend("unavailable"))
            } else {
                Ok(7)
            }
        });

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
        // Slept after attempts 1 and 2 only, never after the successful one.
        assert_eq!(
            *recorder.slept.lock().unwrap(),
            vec![Duration::from_millis(1), Duration::from_millis(2)]
        );
    }

    #[test]
    fn test_returns_last_error_after_exhaustion() {
        let (r, recorder) = retrier(policy(3, 10, None));
        let calls = Cell::new(0);

        let result: Result<(), Error> = r.wrap(&Context::background(), "down", || {
            calls.set(calls.get() + 1);
            Err(Error::backend(format!("attempt {}", calls.get())))
        });

        assert_eq!(result.unwrap_err().to_string(), "backend error: attempt 3");
        assert_eq!(calls.get(), 3);
        assert_eq!(recorder.slept.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_excluded_error_is_not_retried() {
        let (r, recorder) = retrier(policy(5, 1, None));
        let r = r.exclude_kinds([ErrorKind::NotFound]);
        let calls = Cell::new(0);

        let result: Result<(), Error> = r.wrap(&Context::background(), "lookup", || {
            calls.set(calls.get() + 1);
            Err(Error::NotFound.context("get"))
        });

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.get(), 1);
        assert!(recorder.slept.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delay_is_capped() {
        let (r, recorder) = retrier(policy(5, 10, Some(25)));
        let _: Result<(), Error> =
            r.wrap(&Context::background(), "capped", || Err(Error::backend("x")));

        assert_eq!(
            *recorder.slept.lock().unwrap(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(25),
                Duration::from_millis(25),
            ]
        );
    }

    #[test]
    fn test_cancelled_context_stops_retrying() {
        let (r, _recorder) = retrier(policy(5, 1, None));
        let ctx = Context::background().with_cancel();
        let calls = Cell::new(0);

        let result: Result<(), Error> = r.wrap(&ctx, "cancelled", || {
            calls.set(calls.get() + 1);
            ctx.cancel();
            Err(Error::backend("x"))
        });

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let (r, _recorder) = retrier(policy(0, 1, None));
        let calls = Cell::new(0);
        let _: Result<(), Error> = r.wrap(&Context::background(), "once", || {
            calls.set(calls.get() + 1);
            Err(Error::backend("x"))
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let p: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.start_delay_ms, 1000);
        assert_eq!(p.max_delay_ms, Some(10_000));
    }
}
