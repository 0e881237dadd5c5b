// Monotonic millisecond timestamps

use chrono::{DateTime, Duration, Timelike, Utc};

/// Issues timestamps that strictly increase across calls
///
/// Timestamps are truncated to whole milliseconds so they survive a round
/// trip through the persisted ISO-8601 form unchanged. When the wall clock
/// has not advanced (or went backwards) the previous stamp plus one
/// millisecond is issued instead.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    last: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&mut self) -> DateTime<Utc> {
        let wall = truncate_ms(Utc::now());
        let stamp = match self.last {
            Some(last) if wall <= last => last + Duration::milliseconds(1),
            _ => wall,
        };
        self.last = Some(stamp);
        stamp
    }
}

fn truncate_ms(ts: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = ts.nanosecond() / 1_000_000 * 1_000_000;
    ts.with_nanosecond(nanos).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_strictly_increases() {
        let mut clock = Clock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_now_has_millisecond_precision() {
        let mut clock = Clock::new();
        let ts = clock.now();
        assert_eq!(ts.nanosecond() % 1_000_000, 0);
    }
}
