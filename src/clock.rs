use chrono::{DateTime, Local};

use crate::model::{Day, Ms};

/// Source of "now". Injected everywhere time matters so that status and
/// "not in the past" checks are deterministic under test.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Ms;

    fn today(&self) -> Day;
}

/// Wall clock. `today` is the local calendar date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Ms {
        Local::now().timestamp_millis()
    }

    fn today(&self) -> Day {
        Local::now().date_naive()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub now: DateTime<Local>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now }
    }

    /// Midday on `day`, local time.
    pub fn at_day(day: Day) -> Self {
        let noon = day
            .and_hms_opt(12, 0, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .unwrap_or_else(Local::now);
        Self { now: noon }
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> Ms {
        self.now.timestamp_millis()
    }

    fn today(&self) -> Day {
        self.now.date_naive()
    }
}
