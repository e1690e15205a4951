//! clock abstraction for the access gate.
//!
//! the gate never reads wall time directly - every `now` comes through a
//! [`Clock`] so tests can inject synthetic time and exercise quota resets
//! and cooldowns without sleeping.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// source of the current time.
pub trait Clock: Send + Sync {
    /// the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// a settable clock for tests.
///
/// starts at the instant it was created and only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += by;
    }

    /// jump the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}
