//! Strictly increasing timestamp source.

use chrono::{DateTime, TimeDelta, Utc};

/// Wall clock that never hands out the same instant twice.
///
/// When two mutations land within the clock's resolution, or the system
/// clock steps backwards, the next timestamp is bumped one microsecond past
/// the previous one.
#[derive(Debug, Default, Clone)]
pub struct MonotonicClock {
    last: Option<DateTime<Utc>>,
}

impl MonotonicClock {
    /// Create a new clock.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Next timestamp, strictly after every one previously issued or observed.
    pub fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }

    /// Make sure later ticks come after `at`.
    pub fn observe(&mut self, at: DateTime<Utc>) {
        if self.last.is_none_or(|last| at > last) {
            self.last = Some(at);
        }
    }
}
