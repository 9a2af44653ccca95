//! Elapsed-time arithmetic between stored instants.
//!
//! All instants are UTC, so differences are exact and unaffected by DST
//! transitions in the tenant's local zone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Whole seconds from `start` to `end`, clamped at zero.
///
/// A negative difference means the clock moved backwards (or rows were
/// written by skewed hosts). It is logged and treated as no time worked.
pub fn clamped_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds();
    if seconds < 0 {
        tracing::warn!(
            %start,
            %end,
            seconds,
            "clock anomaly: negative duration clamped to zero"
        );
        return 0;
    }
    seconds
}

/// A non-negative span decomposed into calendar units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Elapsed {
    pub total_seconds: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Elapsed {
    /// Decomposes a second count. Negative input is treated as zero.
    pub const fn from_seconds(total_seconds: i64) -> Self {
        let total = if total_seconds < 0 { 0 } else { total_seconds };
        Self {
            total_seconds: total,
            days: total / SECONDS_PER_DAY,
            hours: (total % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
            minutes: (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            seconds: total % SECONDS_PER_MINUTE,
        }
    }

    /// Elapsed time between two instants, clamped at zero.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::from_seconds(clamped_seconds(start, end))
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d ", self.days)?;
        }
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    #[test]
    fn clamped_seconds_positive_span() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(clamped_seconds(start, start + Duration::minutes(45)), 2700);
    }

    #[test]
    fn clamped_seconds_negative_span_is_zero() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(clamped_seconds(start, start - Duration::seconds(5)), 0);
    }

    #[test]
    fn decomposes_into_units() {
        let elapsed = Elapsed::from_seconds(SECONDS_PER_DAY + 2 * 3600 + 3 * 60 + 4);
        assert_eq!(elapsed.days, 1);
        assert_eq!(elapsed.hours, 2);
        assert_eq!(elapsed.minutes, 3);
        assert_eq!(elapsed.seconds, 4);
        assert_eq!(elapsed.to_string(), "1d 02:03:04");
    }

    #[test]
    fn between_spans_dst_change_exactly() {
        // 2025-03-30 is the EU spring-forward date; UTC arithmetic is unaffected.
        let start = Utc.with_ymd_and_hms(2025, 3, 29, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 30, 8, 0, 0).unwrap();
        let elapsed = Elapsed::between(start, end);
        assert_eq!(elapsed.total_seconds, 10 * 3600);
        assert_eq!(elapsed.to_string(), "10:00:00");
    }

    #[test]
    fn negative_input_is_zero() {
        assert_eq!(Elapsed::from_seconds(-30), Elapsed::default());
    }
}
