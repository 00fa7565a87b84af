//! Process-wide rate limiter for the connection test.
//!
//! `lastTestTime` is process-wide and guarded by a mutex, per the design
//! notes; a [`Clock`] is injected so tests can control time deterministically
//! instead of racing a real 60-second window.

use crate::constants::birdweather::TEST_RATE_LIMIT;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Supplies the current time. The real clock reads the system clock;
/// tests substitute a fixed or steppable fake.
pub trait Clock: Send + Sync {
    /// Current time as a Unix timestamp in seconds.
    fn now_unix(&self) -> i64;
}

/// The real wall clock.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        #[allow(clippy::cast_possible_wrap)]
        {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs() as i64
        }
    }
}

/// Gates connection-test runs to at most one per [`TEST_RATE_LIMIT`] window.
pub struct RateLimiter<C> {
    clock: C,
    last_run_unix: Mutex<Option<i64>>,
}

impl<C: Clock> RateLimiter<C> {
    /// Construct a limiter using `clock` for time.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last_run_unix: Mutex::new(None),
        }
    }

    /// Attempt to start a run. On success, records the current time as the
    /// new `lastTestTime`. On rejection, returns the next-allowed Unix
    /// timestamp without mutating state.
    #[allow(clippy::missing_panics_doc)]
    pub fn try_start(&self) -> Result<(), i64> {
        let now = self.clock.now_unix();
        let mut guard = self.last_run_unix.lock().unwrap_or_else(|e| e.into_inner());
        #[allow(clippy::cast_possible_wrap)]
        let window = TEST_RATE_LIMIT.as_secs() as i64;
        if let Some(last) = *guard {
            let next_allowed = last + window;
            if now < next_allowed {
                return Err(next_allowed);
            }
        }
        *guard = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FakeClock(AtomicI64);

    impl Clock for FakeClock {
        fn now_unix(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn first_call_always_succeeds() {
        let limiter = RateLimiter::new(FakeClock(AtomicI64::new(1_000)));
        assert!(limiter.try_start().is_ok());
    }

    #[test]
    fn second_call_within_window_is_rejected_with_expiry() {
        let clock = FakeClock(AtomicI64::new(1_000));
        let limiter = RateLimiter::new(clock);
        limiter.try_start().unwrap();
        limiter.0.0.store(1_030, Ordering::SeqCst);
        let err = limiter.try_start().unwrap_err();
        assert_eq!(err, 1_060);
    }

    #[test]
    fn call_after_window_elapsed_succeeds() {
        let clock = FakeClock(AtomicI64::new(1_000));
        let limiter = RateLimiter::new(clock);
        limiter.try_start().unwrap();
        limiter.0.0.store(1_061, Ordering::SeqCst);
        assert!(limiter.try_start().is_ok());
    }
}
