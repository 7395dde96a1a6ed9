use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};
use tracing::debug;

/// Source of the scheduling "now". Appointments carry local wall-clock times
/// with no zone, so the clock speaks `NaiveDateTime` as well.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        debug!("Fixed clock set to {}", now);
        *self.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
        debug!("Fixed clock advanced to {}", *now);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NaiveDateTime> {
        // poisoning cannot leave a half-written timestamp
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.lock()
    }
}
