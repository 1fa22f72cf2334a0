//! Wall-clock source used for session expiry.
//!
//! Expiry is tracked as absolute epoch seconds, so the only thing the
//! session engine needs from a clock is "now".

use chrono::Utc;

/// Source of the current time in epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Reads the system clock through `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> i64 {
        (**self).now()
    }
}

#[cfg(any(test, feature = "mocks"))]
pub use mock::MockClock;

#[cfg(any(test, feature = "mocks"))]
mod mock {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::Clock;

    /// Settable clock for tests. Clones share the same instant.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        now: Arc<AtomicI64>,
    }

    impl MockClock {
        pub fn new(now: i64) -> Self {
            Self {
                now: Arc::new(AtomicI64::new(now)),
            }
        }

        pub fn set(&self, now: i64) {
            self.now.store(now, Ordering::SeqCst);
        }

        pub fn advance(&self, secs: i64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_matches_chrono() {
        let before = Utc::now().timestamp();
        let now = SystemClock.now();
        let after = Utc::now().timestamp();
        assert!(before <= now && now <= after);
    }

    #[test]
    fn test_mock_clock_shared_between_clones() {
        let clock = MockClock::new(1_000);
        let other = clock.clone();

        clock.advance(60);
        assert_eq!(other.now(), 1_060);

        other.set(5);
        assert_eq!(clock.now(), 5);
    }
}
