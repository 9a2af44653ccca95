//! Report command for per-day regular and overtime hours.
//!
//! `cw report` prints one line per worked date in the range plus a summary,
//! either as a table or inside the JSON envelope.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use cw_core::Scope;
use cw_db::{DailyTotal, Database, TotalsSummary};
use serde::Serialize;

use super::output::write_success;

/// Days shown when no `--from` is given, counting today.
const DEFAULT_RANGE_DAYS: i64 = 7;

/// Computed report data.
#[derive(Debug, Serialize)]
pub struct ReportData {
    pub scope: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DailyTotal>,
    pub summary: TotalsSummary,
}

/// Resolves the report range, defaulting to the week ending today.
pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or_else(|| to - Duration::days(DEFAULT_RANGE_DAYS - 1));
    (from, to)
}

pub fn generate_report_data(
    db: &Database,
    scope: &Scope,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<ReportData> {
    let days = db
        .daily_totals(scope, from, to)
        .context("failed to load daily totals")?;
    let summary = TotalsSummary::from_days(&days);
    Ok(ReportData {
        scope: scope.to_string(),
        from,
        to,
        days,
        summary,
    })
}

/// Formats report data as a human-readable table.
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();

    writeln!(
        output,
        "HOURS REPORT: {} ({} to {})",
        data.scope, data.from, data.to
    )
    .unwrap();
    writeln!(output).unwrap();

    if data.days.is_empty() {
        writeln!(output, "No attendance recorded in this range.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<12}{:>9}{:>10}{:>8}",
        "DATE", "REGULAR", "OVERTIME", "TOTAL"
    )
    .unwrap();
    for day in &data.days {
        writeln!(
            output,
            "{:<12}{:>9.2}{:>10.2}{:>8.2}",
            day.date.to_string(),
            day.regular_hours,
            day.overtime_hours,
            day.total_hours
        )
        .unwrap();
    }
    writeln!(output, "{}", "─".repeat(39)).unwrap();
    writeln!(
        output,
        "{:<12}{:>9.2}{:>10.2}{:>8.2}",
        "TOTAL",
        data.summary.regular_hours,
        data.summary.overtime_hours,
        data.summary.total_hours
    )
    .unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Days present: {}", data.summary.days_present).unwrap();

    output
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    scope: &Scope,
    range: (NaiveDate, NaiveDate),
    json: bool,
) -> Result<()> {
    let (from, to) = range;
    let data = generate_report_data(db, scope, from, to)?;
    if json {
        write_success(writer, &data)
    } else {
        write!(writer, "{}", format_report(&data))?;
        Ok(())
    }
}
