//! Daily attendance records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::hours::{HoursSplit, REPORT_PRECISION, round_to};
use crate::types::{AttendanceId, AttendanceStatus, Scope, TenantId, UserId};

/// One user's work-presence record for a day.
///
/// `check_in` is written once at creation and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceDay {
    pub id: AttendanceId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub is_present: bool,
}

impl AttendanceDay {
    /// An open day created by checking in.
    pub fn check_in(id: AttendanceId, scope: &Scope, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tenant_id: scope.tenant.clone(),
            user_id: scope.user.clone(),
            date,
            check_in: Some(now),
            check_out: None,
            status: AttendanceStatus::In,
            regular_hours: 0.0,
            overtime_hours: 0.0,
            is_present: true,
        }
    }

    /// A day tracked only through timer sessions, without a check-in pair.
    pub fn from_timer_totals(
        id: AttendanceId,
        scope: &Scope,
        date: NaiveDate,
        split: HoursSplit,
    ) -> Self {
        Self {
            id,
            tenant_id: scope.tenant.clone(),
            user_id: scope.user.clone(),
            date,
            check_in: None,
            check_out: None,
            status: AttendanceStatus::Out,
            regular_hours: split.regular_hours,
            overtime_hours: split.overtime_hours,
            is_present: true,
        }
    }

    pub const fn is_open(&self) -> bool {
        matches!(self.status, AttendanceStatus::In)
    }

    /// Stored hours as a split.
    pub const fn hours(&self) -> HoursSplit {
        HoursSplit {
            regular_hours: self.regular_hours,
            overtime_hours: self.overtime_hours,
        }
    }

    /// Total hours rounded for reporting.
    pub fn total_hours(&self) -> f64 {
        round_to(self.hours().total_hours(), REPORT_PRECISION)
    }

    /// Replaces the day totals and marks the user present.
    pub const fn apply_hours(&mut self, split: HoursSplit) {
        self.regular_hours = split.regular_hours;
        self.overtime_hours = split.overtime_hours;
        self.is_present = true;
    }

    /// Closes the day at `now` with the given totals.
    pub fn check_out(&mut self, now: DateTime<Utc>, split: HoursSplit) {
        self.check_out = Some(now);
        self.status = AttendanceStatus::Out;
        self.apply_hours(split);
    }
}
