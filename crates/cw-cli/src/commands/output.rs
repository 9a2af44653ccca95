//! JSON envelope and response views shared by the commands.
//!
//! Every command prints `{"success": true, "data": ...}` or
//! `{"success": false, "message": ...}`. Business rejections are ordinary
//! output; storage failures also return an error so the process exits
//! non-zero.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use cw_core::{AttendanceDay, AttendanceStatus, Elapsed, SessionStatus, TimerSession};
use cw_db::TimekeepingError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Success<'a, T> {
    success: bool,
    data: &'a T,
}

#[derive(Debug, Serialize)]
struct Failure<'a> {
    success: bool,
    message: &'a str,
}

pub fn write_success<W: Write, T: Serialize>(writer: &mut W, data: &T) -> Result<()> {
    let envelope = Success {
        success: true,
        data,
    };
    writeln!(writer, "{}", serde_json::to_string_pretty(&envelope)?)?;
    Ok(())
}

pub fn write_failure<W: Write>(writer: &mut W, message: &str) -> Result<()> {
    let envelope = Failure {
        success: false,
        message,
    };
    writeln!(writer, "{}", serde_json::to_string_pretty(&envelope)?)?;
    Ok(())
}

/// Writes an engine result, mapping rejections to a failure envelope.
pub fn write_outcome<W, T, V, F>(
    writer: &mut W,
    result: Result<T, TimekeepingError>,
    view: F,
) -> Result<()>
where
    W: Write,
    V: Serialize,
    F: FnOnce(&T) -> V,
{
    match result {
        Ok(value) => write_success(writer, &view(&value)),
        Err(err) if err.is_rejection() => {
            tracing::debug!(error = %err, "operation rejected");
            write_failure(writer, &err.to_string())
        }
        Err(err) => {
            write_failure(writer, "operation failed; nothing was changed")?;
            Err(anyhow::Error::new(err).context("timekeeping operation failed"))
        }
    }
}

/// An attendance day with hours at reporting precision.
#[derive(Debug, Serialize)]
pub struct AttendanceView {
    pub id: String,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub total_hours: f64,
    pub is_present: bool,
}

impl From<&AttendanceDay> for AttendanceView {
    fn from(day: &AttendanceDay) -> Self {
        let hours = day.hours().reported();
        Self {
            id: day.id.to_string(),
            date: day.date,
            check_in: day.check_in,
            check_out: day.check_out,
            status: day.status,
            regular_hours: hours.regular_hours,
            overtime_hours: hours.overtime_hours,
            total_hours: day.total_hours(),
            is_present: day.is_present,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub status: SessionStatus,
}

impl From<&TimerSession> for SessionView {
    fn from(session: &TimerSession) -> Self {
        Self {
            id: session.id.to_string(),
            date: session.date,
            start_time: session.start_time,
            stop_time: session.stop_time,
            end_time: session.end_time,
            duration_seconds: session.duration_seconds,
            status: session.status,
        }
    }
}

/// Elapsed time as both a counter and a clock string.
#[derive(Debug, Serialize)]
pub struct ElapsedView {
    pub total_seconds: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub display: String,
}

impl From<Elapsed> for ElapsedView {
    fn from(elapsed: Elapsed) -> Self {
        Self {
            total_seconds: elapsed.total_seconds,
            days: elapsed.days,
            hours: elapsed.hours,
            minutes: elapsed.minutes,
            seconds: elapsed.seconds,
            display: elapsed.to_string(),
        }
    }
}
