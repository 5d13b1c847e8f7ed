//! Wall-clock access in the configured local time zone

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::{PoisonError, RwLock};

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;

    fn timezone(&self) -> Tz {
        self.now().timezone()
    }
}

/// System time converted to a fixed IANA zone
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Manually driven clock, mainly for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Tz>>,
}

impl ManualClock {
    pub const fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Clock at a local wall time; `None` if that time does not exist in `tz`
    pub fn at_local(
        tz: Tz,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Option<Self> {
        tz.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .map(Self::new)
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Tz> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}
