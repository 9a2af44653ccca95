//! Regular/overtime hours split.
//!
//! The overtime policy is a straight per-day threshold: hours up to the
//! tenant's standard work hours are regular, everything beyond is overtime.
//! There are no tiered rates and no weekly accounting.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Decimal places kept for hours written to storage.
pub const STORAGE_PRECISION: i32 = 4;

/// Decimal places used for every externally reported hours value.
pub const REPORT_PRECISION: i32 = 2;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// A tenant's standard work hours per day, guaranteed to lie in \[1, 24\].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(into = "f64")]
pub struct StandardWorkHours(f64);

impl StandardWorkHours {
    /// Used when a tenant has no setting or an invalid one.
    pub const DEFAULT: Self = Self(8.0);

    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 24.0;

    /// Creates a validated value.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value.is_nan() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::WorkHoursOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Resolves a stored tenant setting, substituting the default when the
    /// setting is missing or out of range.
    ///
    /// An out-of-range value is logged and never surfaced to the caller.
    pub fn from_setting(setting: Option<f64>) -> Self {
        let Some(value) = setting else {
            return Self::DEFAULT;
        };
        match Self::new(value) {
            Ok(hours) => hours,
            Err(err) => {
                tracing::warn!(%err, "invalid working_hours setting, using default");
                Self::DEFAULT
            }
        }
    }

    /// Returns the inner value in hours.
    #[must_use]
    pub const fn hours(self) -> f64 {
        self.0
    }

    /// The threshold expressed in seconds.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value is bounded to [1, 24] hours"
    )]
    pub fn as_seconds(self) -> i64 {
        (self.0 * SECONDS_PER_HOUR).round() as i64
    }
}

impl Default for StandardWorkHours {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for StandardWorkHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StandardWorkHours> for f64 {
    fn from(h: StandardWorkHours) -> Self {
        h.0
    }
}

impl<'de> Deserialize<'de> for StandardWorkHours {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// Worked hours split into regular and overtime buckets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HoursSplit {
    pub regular_hours: f64,
    pub overtime_hours: f64,
}

impl HoursSplit {
    /// Splits `total_hours` against the threshold.
    ///
    /// Negative or NaN totals are treated as zero. The result is rounded to
    /// [`STORAGE_PRECISION`].
    pub fn compute(total_hours: f64, standard: StandardWorkHours) -> Self {
        let total = non_negative(total_hours);
        let threshold = standard.hours();
        Self {
            regular_hours: round_to(total.min(threshold), STORAGE_PRECISION),
            overtime_hours: round_to((total - threshold).max(0.0), STORAGE_PRECISION),
        }
    }

    /// Splits a number of worked seconds.
    pub fn from_seconds(total_seconds: i64, standard: StandardWorkHours) -> Self {
        Self::compute(seconds_to_hours(total_seconds), standard)
    }

    /// Splits one attendance row's hours when `booked_hours` of the same day
    /// are already held by other rows.
    ///
    /// Only the part of the threshold those rows left unused counts as
    /// regular, so the day as a whole never exceeds the threshold.
    pub fn with_allowance(row_hours: f64, booked_hours: f64, standard: StandardWorkHours) -> Self {
        let row = non_negative(row_hours);
        let allowance = (standard.hours() - non_negative(booked_hours)).max(0.0);
        let regular = row.min(allowance);
        Self {
            regular_hours: round_to(regular, STORAGE_PRECISION),
            overtime_hours: round_to(row - regular, STORAGE_PRECISION),
        }
    }

    /// Total worked hours.
    #[must_use]
    pub fn total_hours(self) -> f64 {
        self.regular_hours + self.overtime_hours
    }

    /// The split rounded for external reporting.
    #[must_use]
    pub fn reported(self) -> Self {
        Self {
            regular_hours: round_to(self.regular_hours, REPORT_PRECISION),
            overtime_hours: round_to(self.overtime_hours, REPORT_PRECISION),
        }
    }
}

fn non_negative(hours: f64) -> f64 {
    if hours.is_nan() { 0.0 } else { hours.max(0.0) }
}

/// Converts whole seconds to fractional hours.
#[expect(
    clippy::cast_precision_loss,
    reason = "day-scale second counts are far below 2^52"
)]
pub fn seconds_to_hours(seconds: i64) -> f64 {
    seconds.max(0) as f64 / SECONDS_PER_HOUR
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn std8() -> StandardWorkHours {
        StandardWorkHours::new(8.0).unwrap()
    }

    #[test]
    fn standard_hours_validates_range() {
        assert!(StandardWorkHours::new(1.0).is_ok());
        assert!(StandardWorkHours::new(24.0).is_ok());
        assert!(StandardWorkHours::new(7.5).is_ok());
        assert!(StandardWorkHours::new(0.5).is_err());
        assert!(StandardWorkHours::new(24.5).is_err());
        assert!(StandardWorkHours::new(f64::NAN).is_err());
    }

    #[test]
    fn from_setting_falls_back_to_default() {
        assert_eq!(StandardWorkHours::from_setting(None), StandardWorkHours::DEFAULT);
        assert_eq!(
            StandardWorkHours::from_setting(Some(30.0)),
            StandardWorkHours::DEFAULT
        );
        assert_eq!(
            StandardWorkHours::from_setting(Some(0.0)),
            StandardWorkHours::DEFAULT
        );
        assert!((StandardWorkHours::from_setting(Some(6.0)).hours() - 6.0).abs() < EPSILON);
    }

    #[test]
    fn standard_hours_deserialize_rejects_out_of_range() {
        let parsed: Result<StandardWorkHours, _> = serde_json::from_str("25");
        assert!(parsed.is_err());
        let parsed: StandardWorkHours = serde_json::from_str("7.5").unwrap();
        assert!((parsed.hours() - 7.5).abs() < EPSILON);
    }

    #[test]
    fn as_seconds_converts_threshold() {
        assert_eq!(std8().as_seconds(), 28_800);
        assert_eq!(StandardWorkHours::new(7.5).unwrap().as_seconds(), 27_000);
    }

    #[test]
    fn split_under_threshold_is_all_regular() {
        let split = HoursSplit::compute(5.25, std8());
        assert!((split.regular_hours - 5.25).abs() < EPSILON);
        assert!(split.overtime_hours.abs() < EPSILON);
    }

    #[test]
    fn split_over_threshold() {
        let split = HoursSplit::compute(9.5, std8());
        assert!((split.regular_hours - 8.0).abs() < EPSILON);
        assert!((split.overtime_hours - 1.5).abs() < EPSILON);
    }

    #[test]
    fn split_of_summed_sessions_rounds_cleanly() {
        let split = HoursSplit::compute(5.0 + 4.2, std8()).reported();
        assert!((split.regular_hours - 8.0).abs() < EPSILON);
        assert!((split.overtime_hours - 1.2).abs() < EPSILON);
    }

    #[test]
    fn allowance_shrinks_with_hours_booked_elsewhere() {
        let split = HoursSplit::with_allowance(4.2, 5.0, std8());
        assert!((split.regular_hours - 3.0).abs() < EPSILON);
        assert!((split.overtime_hours - 1.2).abs() < EPSILON);

        let split = HoursSplit::with_allowance(3.0, 9.0, std8());
        assert!(split.regular_hours.abs() < EPSILON);
        assert!((split.overtime_hours - 3.0).abs() < EPSILON);
    }

    #[test]
    fn allowance_without_booked_hours_matches_compute() {
        for total in [0.0, 2.5, 8.0, 11.75] {
            assert_eq!(
                HoursSplit::with_allowance(total, 0.0, std8()),
                HoursSplit::compute(total, std8())
            );
        }
        assert_eq!(
            HoursSplit::with_allowance(f64::NAN, -1.0, std8()),
            HoursSplit::default()
        );
    }

    #[test]
    fn split_clamps_negative_and_nan_totals() {
        assert_eq!(HoursSplit::compute(-3.0, std8()), HoursSplit::default());
        assert_eq!(HoursSplit::compute(f64::NAN, std8()), HoursSplit::default());
    }

    #[test]
    fn split_preserves_total_across_thresholds() {
        for threshold in [1.0, 4.0, 7.5, 8.0, 12.0, 24.0] {
            let standard = StandardWorkHours::new(threshold).unwrap();
            for tenths in 0..=300 {
                let total = f64::from(tenths) / 10.0;
                let split = HoursSplit::compute(total, standard);
                assert!(
                    (split.total_hours() - total).abs() < 1e-3,
                    "total {total} threshold {threshold}: {split:?}"
                );
                assert!(split.regular_hours <= threshold + EPSILON);
                assert!(split.overtime_hours >= 0.0);
            }
        }
    }

    #[test]
    fn from_seconds_uses_hour_fractions() {
        let split = HoursSplit::from_seconds(9 * 3600 + 1800, std8());
        assert!((split.regular_hours - 8.0).abs() < EPSILON);
        assert!((split.overtime_hours - 1.5).abs() < EPSILON);
    }

    #[test]
    fn storage_precision_keeps_four_decimals() {
        // 1 second over 8 hours
        let split = HoursSplit::from_seconds(8 * 3600 + 1, std8());
        assert!((split.overtime_hours - 0.0003).abs() < EPSILON);
        assert!(split.reported().overtime_hours.abs() < EPSILON);
    }

    #[test]
    fn round_to_rounds_half_away_from_zero() {
        assert!((round_to(2.5, 0) - 3.0).abs() < EPSILON);
        assert!((round_to(0.123_456, 4) - 0.1235).abs() < EPSILON);
    }
}
