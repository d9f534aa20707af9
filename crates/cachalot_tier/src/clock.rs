// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! A minimal clock abstraction so TTL expiry is controllable in tests.

use std::time::SystemTime;

#[cfg(any(test, feature = "test-util"))]
use std::{sync::Arc, time::Duration};

/// Provides the current absolute time to cache tiers.
///
/// In production the clock reads the system time. With the `test-util`
/// feature, [`Clock::new_frozen`] creates a clock that only moves when
/// explicitly advanced, which makes TTL tests fast and deterministic.
///
/// Cloning a clock is cheap and every clone shares the same underlying state:
/// advancing a frozen clock through one clone is visible to all others.
#[derive(Clone, Debug)]
pub struct Clock {
    inner: Inner,
}

#[derive(Clone, Debug)]
enum Inner {
    System,
    #[cfg(any(test, feature = "test-util"))]
    Frozen(Arc<parking_lot::Mutex<SystemTime>>),
}

impl Clock {
    /// Creates a clock backed by the system time.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Inner::System }
    }

    /// Returns the current absolute time in UTC.
    #[must_use]
    pub fn system_time(&self) -> SystemTime {
        match &self.inner {
            Inner::System => SystemTime::now(),
            #[cfg(any(test, feature = "test-util"))]
            Inner::Frozen(time) => *time.lock(),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock {
    /// Creates a frozen clock that only moves via [`Clock::advance`] or
    /// [`Clock::set`].
    ///
    /// The frozen clock starts at an arbitrary fixed point well past the
    /// epoch, so subtracting entry ages never underflows.
    #[must_use]
    pub fn new_frozen() -> Self {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        Self {
            inner: Inner::Frozen(Arc::new(parking_lot::Mutex::new(start))),
        }
    }

    /// Advances a frozen clock by `duration`. Has no effect on system clocks.
    pub fn advance(&self, duration: Duration) {
        match &self.inner {
            Inner::System => {}
            Inner::Frozen(time) => {
                let mut time = time.lock();
                *time += duration;
            }
        }
    }

    /// Sets a frozen clock to an absolute time. Has no effect on system clocks.
    pub fn set(&self, to: SystemTime) {
        match &self.inner {
            Inner::System => {}
            Inner::Frozen(time) => *time.lock() = to,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_moves_forward() {
        let clock = Clock::new();
        let t1 = clock.system_time();
        let t2 = clock.system_time();
        assert!(t2 >= t1);
    }

    #[test]
    fn frozen_clock_is_stationary_until_advanced() {
        let clock = Clock::new_frozen();
        let t1 = clock.system_time();
        assert_eq!(clock.system_time(), t1);

        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.system_time(), t1 + Duration::from_secs(30));
    }

    #[test]
    fn clones_share_frozen_state() {
        let clock = Clock::new_frozen();
        let clone = clock.clone();
        clone.advance(Duration::from_secs(5));
        assert_eq!(clock.system_time(), clone.system_time());
    }
}
