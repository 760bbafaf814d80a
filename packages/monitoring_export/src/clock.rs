use std::fmt::Debug;
use std::time::SystemTime;

/// Source of the wall clock time that flush intervals are stamped with.
///
/// This can be replaced in tests to make the stamped intervals deterministic.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Debug + Send {
    /// The current wall clock time.
    fn now(&self) -> SystemTime;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg_attr(test, mutants::skip)] // Reads the real clock, no meaningful mutation to detect.
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(SystemClock: Clock, Send, Sync, Copy);

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now() > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn mock_clock_returns_configured_time() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);

        let mut clock = MockClock::new();
        clock.expect_now().return_const(at);

        assert_eq!(clock.now(), at);
    }
}
