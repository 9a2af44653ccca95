//! Check-in, check-out and status commands.

use std::io::Write;

use anyhow::Result;
use cw_core::{Clock, Scope};
use cw_db::{CheckInStatus, Timekeeper};
use serde::Serialize;

use super::output::{AttendanceView, ElapsedView, write_outcome};

#[derive(Debug, Serialize)]
struct StatusView {
    checked_in: bool,
    attendance: Option<AttendanceView>,
    elapsed: Option<ElapsedView>,
    is_overtime: bool,
    standard_work_hours: f64,
}

impl From<&CheckInStatus> for StatusView {
    fn from(status: &CheckInStatus) -> Self {
        Self {
            checked_in: status.checked_in,
            attendance: status.attendance.as_ref().map(AttendanceView::from),
            elapsed: status.elapsed.map(ElapsedView::from),
            is_overtime: status.is_overtime,
            standard_work_hours: status.standard_work_hours.hours(),
        }
    }
}

pub fn check_in<W: Write, C: Clock>(
    writer: &mut W,
    timekeeper: &mut Timekeeper<'_, C>,
    scope: &Scope,
) -> Result<()> {
    let outcome = timekeeper.check_in(scope);
    write_outcome(writer, outcome, |day| AttendanceView::from(day))
}

pub fn check_out<W: Write, C: Clock>(
    writer: &mut W,
    timekeeper: &mut Timekeeper<'_, C>,
    scope: &Scope,
) -> Result<()> {
    let outcome = timekeeper.check_out(scope);
    write_outcome(writer, outcome, |day| AttendanceView::from(day))
}

pub fn status<W: Write, C: Clock>(
    writer: &mut W,
    timekeeper: &Timekeeper<'_, C>,
    scope: &Scope,
) -> Result<()> {
    let outcome = timekeeper.status(scope);
    write_outcome(writer, outcome, |status| StatusView::from(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use cw_core::{ManualClock, TenantId, UserId};
    use cw_db::Database;
    use serde_json::Value;

    fn scope() -> Scope {
        Scope::new(TenantId::new("acme").unwrap(), UserId::new("ana").unwrap())
    }

    fn nine_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn json(output: &[u8]) -> Value {
        serde_json::from_slice(output).unwrap()
    }

    #[test]
    fn check_in_then_out_reports_rounded_hours() {
        let mut db = Database::open_in_memory().unwrap();
        let clock = ManualClock::new(nine_am());

        let mut output = Vec::new();
        check_in(&mut output, &mut Timekeeper::new(&mut db, &clock), &scope()).unwrap();
        let data = json(&output);
        assert_eq!(data["success"], true);
        assert_eq!(data["data"]["status"], "in");
        assert_eq!(data["data"]["date"], "2025-03-10");

        clock.advance(Duration::seconds(9 * 3600 + 20 * 60 + 17));
        let mut output = Vec::new();
        check_out(&mut output, &mut Timekeeper::new(&mut db, &clock), &scope()).unwrap();
        let data = json(&output);
        assert_eq!(data["data"]["status"], "out");
        assert_eq!(data["data"]["regular_hours"], 8.0);
        assert_eq!(data["data"]["overtime_hours"], 1.34);
        assert_eq!(data["data"]["total_hours"], 9.34);
    }

    #[test]
    fn second_check_in_is_a_rejection() {
        let mut db = Database::open_in_memory().unwrap();
        let clock = ManualClock::new(nine_am());
        let mut timekeeper = Timekeeper::new(&mut db, &clock);

        check_in(&mut Vec::new(), &mut timekeeper, &scope()).unwrap();
        let mut output = Vec::new();
        check_in(&mut output, &mut timekeeper, &scope()).unwrap();

        let data = json(&output);
        assert_eq!(data["success"], false);
        assert!(data["message"].as_str().unwrap().contains("already checked in"));
    }

    #[test]
    fn status_shows_elapsed_and_overtime() {
        let mut db = Database::open_in_memory().unwrap();
        let clock = ManualClock::new(nine_am());
        let mut timekeeper = Timekeeper::new(&mut db, &clock);
        check_in(&mut Vec::new(), &mut timekeeper, &scope()).unwrap();

        clock.advance(Duration::minutes(8 * 60 + 5));
        let mut output = Vec::new();
        status(&mut output, &Timekeeper::new(&mut db, &clock), &scope()).unwrap();

        let data = json(&output);
        assert_eq!(data["data"]["checked_in"], true);
        assert_eq!(data["data"]["is_overtime"], true);
        assert_eq!(data["data"]["standard_work_hours"], 8.0);
        assert_eq!(data["data"]["elapsed"]["display"], "08:05:00");
    }
}
