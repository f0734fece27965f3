//! Time source for the engine. Everything time-dependent takes a `now`;
//! callers get one from a `Clock` so tests can pin it.

use chrono::{DateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_never_moves() {
        let t = Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap();
        let c = FixedClock(t);
        assert_eq!(c.now(), t);
        assert_eq!(c.now(), t);
    }
}
