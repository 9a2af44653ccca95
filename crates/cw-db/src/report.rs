//! Per-day hour totals for reporting.

use chrono::NaiveDate;
use cw_core::hours::round_to;
use cw_core::{REPORT_PRECISION, Scope};
use rusqlite::params;
use serde::Serialize;

use crate::{Database, DbError, format_date};

/// One date's worked hours, summed over its attendance rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub total_hours: f64,
    pub is_present: bool,
    pub records: usize,
}

/// Totals across a report range.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TotalsSummary {
    pub days_present: usize,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub total_hours: f64,
}

impl TotalsSummary {
    pub fn from_days(days: &[DailyTotal]) -> Self {
        let regular: f64 = days.iter().map(|d| d.regular_hours).sum();
        let overtime: f64 = days.iter().map(|d| d.overtime_hours).sum();
        Self {
            days_present: days.iter().filter(|d| d.is_present).count(),
            regular_hours: round_to(regular, REPORT_PRECISION),
            overtime_hours: round_to(overtime, REPORT_PRECISION),
            total_hours: round_to(regular + overtime, REPORT_PRECISION),
        }
    }
}

impl Database {
    /// Daily totals for `from..=to`, ascending by date. Dates without any
    /// attendance row are omitted.
    pub fn daily_totals(
        &self,
        scope: &Scope,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyTotal>, DbError> {
        if to < from {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT date, SUM(regular_hours), SUM(overtime_hours), MAX(is_present), COUNT(*)
            FROM attendance
            WHERE tenant_id = ? AND user_id = ? AND date >= ? AND date <= ?
            GROUP BY date
            ORDER BY date ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                scope.tenant.as_str(),
                scope.user.as_str(),
                format_date(from),
                format_date(to)
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;

        let mut totals = Vec::new();
        for row in rows {
            let (date, regular, overtime, is_present, records) = row?;
            let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|source| {
                DbError::TimestampParse {
                    table: "attendance",
                    row_id: date.clone(),
                    value: date.clone(),
                    source,
                }
            })?;
            totals.push(DailyTotal {
                date: parsed,
                regular_hours: round_to(regular, REPORT_PRECISION),
                overtime_hours: round_to(overtime, REPORT_PRECISION),
                total_hours: round_to(regular + overtime, REPORT_PRECISION),
                is_present,
                records: usize::try_from(records).unwrap_or_default(),
            });
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use cw_core::{ManualClock, TenantId, UserId};

    use crate::Timekeeper;

    fn scope() -> Scope {
        Scope::new(TenantId::new("acme").unwrap(), UserId::new("ana").unwrap())
    }

    fn nine_am(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn work_day(db: &mut Database, clock: &ManualClock, day: u32, minutes: i64) {
        clock.set(nine_am(day));
        Timekeeper::new(db, clock).check_in(&scope()).unwrap();
        clock.advance(Duration::minutes(minutes));
        Timekeeper::new(db, clock).check_out(&scope()).unwrap();
    }

    #[test]
    fn daily_totals_group_by_date() {
        let mut db = Database::open_in_memory().unwrap();
        let clock = ManualClock::new(nine_am(10));

        work_day(&mut db, &clock, 10, 9 * 60 + 30);
        work_day(&mut db, &clock, 11, 6 * 60);
        work_day(&mut db, &clock, 13, 8 * 60);

        let totals = db.daily_totals(&scope(), date(10), date(12)).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].date, date(10));
        assert!((totals[0].regular_hours - 8.0).abs() < 1e-9);
        assert!((totals[0].overtime_hours - 1.5).abs() < 1e-9);
        assert!((totals[0].total_hours - 9.5).abs() < 1e-9);
        assert_eq!(totals[1].date, date(11));
        assert!((totals[1].total_hours - 6.0).abs() < 1e-9);

        let summary = TotalsSummary::from_days(&totals);
        assert_eq!(summary.days_present, 2);
        assert!((summary.regular_hours - 14.0).abs() < 1e-9);
        assert!((summary.overtime_hours - 1.5).abs() < 1e-9);
        assert!((summary.total_hours - 15.5).abs() < 1e-9);
    }

    #[test]
    fn repeated_check_ins_on_one_day_are_summed() {
        let mut db = Database::open_in_memory().unwrap();
        let clock = ManualClock::new(nine_am(10));

        work_day(&mut db, &clock, 10, 4 * 60);
        clock.set(nine_am(10) + Duration::hours(5));
        Timekeeper::new(&mut db, &clock).check_in(&scope()).unwrap();
        clock.advance(Duration::hours(3));
        Timekeeper::new(&mut db, &clock).check_out(&scope()).unwrap();

        let totals = db.daily_totals(&scope(), date(10), date(10)).unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].records, 2);
        assert!((totals[0].total_hours - 7.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_range_is_empty() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.daily_totals(&scope(), date(12), date(10)).unwrap().is_empty());
    }
}
