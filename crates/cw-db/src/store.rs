//! Row-level reads and writes shared by the engine and the public queries.
//!
//! Every function takes a `&Connection` so it can run either on the plain
//! connection or inside a transaction (which derefs to one). No statement in
//! this module updates `attendance.check_in`.

use chrono::{DateTime, NaiveDate, Utc};
use cw_core::{
    AttendanceDay, AttendanceId, AttendanceStatus, Scope, SessionId, SessionStatus,
    StandardWorkHours, TenantId, TimerSession, UserId, ValidationError,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{DbError, format_date, format_timestamp};

const ATTENDANCE_COLUMNS: &str = "id, tenant_id, user_id, date, check_in, check_out, status, \
    regular_hours, overtime_hours, is_present";
const SESSION_COLUMNS: &str = "id, tenant_id, user_id, attendance_id, date, start_time, \
    stop_time, end_time, duration_seconds, status";

#[derive(Debug)]
struct AttendanceRow {
    id: String,
    tenant_id: String,
    user_id: String,
    date: String,
    check_in: Option<String>,
    check_out: Option<String>,
    status: String,
    regular_hours: f64,
    overtime_hours: f64,
    is_present: bool,
}

impl AttendanceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            user_id: row.get(2)?,
            date: row.get(3)?,
            check_in: row.get(4)?,
            check_out: row.get(5)?,
            status: row.get(6)?,
            regular_hours: row.get(7)?,
            overtime_hours: row.get(8)?,
            is_present: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<AttendanceDay, DbError> {
        const TABLE: &str = "attendance";
        let invalid = |source: ValidationError| DbError::InvalidRow {
            table: TABLE,
            row_id: self.id.clone(),
            source,
        };
        Ok(AttendanceDay {
            id: AttendanceId::new(self.id.clone()).map_err(invalid)?,
            tenant_id: TenantId::new(self.tenant_id.clone()).map_err(invalid)?,
            user_id: UserId::new(self.user_id.clone()).map_err(invalid)?,
            date: parse_date(&self.date, TABLE, &self.id)?,
            check_in: parse_optional_timestamp(self.check_in.as_deref(), TABLE, &self.id)?,
            check_out: parse_optional_timestamp(self.check_out.as_deref(), TABLE, &self.id)?,
            status: self.status.parse::<AttendanceStatus>().map_err(invalid)?,
            regular_hours: self.regular_hours,
            overtime_hours: self.overtime_hours,
            is_present: self.is_present,
        })
    }
}

#[derive(Debug)]
struct SessionRow {
    id: String,
    tenant_id: String,
    user_id: String,
    attendance_id: Option<String>,
    date: String,
    start_time: String,
    stop_time: Option<String>,
    end_time: Option<String>,
    duration_seconds: i64,
    status: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            user_id: row.get(2)?,
            attendance_id: row.get(3)?,
            date: row.get(4)?,
            start_time: row.get(5)?,
            stop_time: row.get(6)?,
            end_time: row.get(7)?,
            duration_seconds: row.get(8)?,
            status: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<TimerSession, DbError> {
        const TABLE: &str = "timer_sessions";
        let invalid = |source: ValidationError| DbError::InvalidRow {
            table: TABLE,
            row_id: self.id.clone(),
            source,
        };
        Ok(TimerSession {
            id: SessionId::new(self.id.clone()).map_err(invalid)?,
            tenant_id: TenantId::new(self.tenant_id.clone()).map_err(invalid)?,
            user_id: UserId::new(self.user_id.clone()).map_err(invalid)?,
            attendance_id: self
                .attendance_id
                .clone()
                .map(AttendanceId::new)
                .transpose()
                .map_err(invalid)?,
            date: parse_date(&self.date, TABLE, &self.id)?,
            start_time: parse_timestamp(&self.start_time, TABLE, &self.id)?,
            stop_time: parse_optional_timestamp(self.stop_time.as_deref(), TABLE, &self.id)?,
            end_time: parse_optional_timestamp(self.end_time.as_deref(), TABLE, &self.id)?,
            duration_seconds: self.duration_seconds.max(0),
            status: self.status.parse::<SessionStatus>().map_err(invalid)?,
        })
    }
}

fn parse_timestamp(
    value: &str,
    table: &'static str,
    row_id: &str,
) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            table,
            row_id: row_id.to_string(),
            value: value.to_string(),
            source,
        })
}

fn parse_optional_timestamp(
    value: Option<&str>,
    table: &'static str,
    row_id: &str,
) -> Result<Option<DateTime<Utc>>, DbError> {
    value
        .map(|value| parse_timestamp(value, table, row_id))
        .transpose()
}

fn parse_date(value: &str, table: &'static str, row_id: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| DbError::TimestampParse {
        table,
        row_id: row_id.to_string(),
        value: value.to_string(),
        source,
    })
}

fn collect_attendance(
    rows: impl Iterator<Item = rusqlite::Result<AttendanceRow>>,
) -> Result<Vec<AttendanceDay>, DbError> {
    let mut days = Vec::new();
    for row in rows {
        days.push(row?.into_record()?);
    }
    Ok(days)
}

fn collect_sessions(
    rows: impl Iterator<Item = rusqlite::Result<SessionRow>>,
) -> Result<Vec<TimerSession>, DbError> {
    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?.into_record()?);
    }
    Ok(sessions)
}

// ========== Tenant settings ==========

pub fn standard_work_hours(
    conn: &Connection,
    tenant: &TenantId,
) -> Result<StandardWorkHours, DbError> {
    let setting: Option<Option<f64>> = conn
        .query_row(
            "SELECT working_hours FROM tenant_settings WHERE tenant_id = ?",
            [tenant.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(StandardWorkHours::from_setting(setting.flatten()))
}

// ========== Attendance ==========

/// The open (`in`) attendance row for a date, if any.
pub fn open_attendance(
    conn: &Connection,
    scope: &Scope,
    date: NaiveDate,
) -> Result<Option<AttendanceDay>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {ATTENDANCE_COLUMNS}
                FROM attendance
                WHERE tenant_id = ? AND user_id = ? AND date = ? AND status = 'in'
                ORDER BY check_in DESC
                LIMIT 1
                "
            ),
            params![scope.tenant.as_str(), scope.user.as_str(), format_date(date)],
            AttendanceRow::from_row,
        )
        .optional()?;
    row.map(AttendanceRow::into_record).transpose()
}

pub fn attendance_by_id(
    conn: &Connection,
    scope: &Scope,
    id: &AttendanceId,
) -> Result<Option<AttendanceDay>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {ATTENDANCE_COLUMNS}
                FROM attendance
                WHERE id = ? AND tenant_id = ? AND user_id = ?
                "
            ),
            params![id.as_str(), scope.tenant.as_str(), scope.user.as_str()],
            AttendanceRow::from_row,
        )
        .optional()?;
    row.map(AttendanceRow::into_record).transpose()
}

/// The most recently created attendance row for a date, open or not.
pub fn latest_attendance(
    conn: &Connection,
    scope: &Scope,
    date: NaiveDate,
) -> Result<Option<AttendanceDay>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {ATTENDANCE_COLUMNS}
                FROM attendance
                WHERE tenant_id = ? AND user_id = ? AND date = ?
                ORDER BY rowid DESC
                LIMIT 1
                "
            ),
            params![scope.tenant.as_str(), scope.user.as_str(), format_date(date)],
            AttendanceRow::from_row,
        )
        .optional()?;
    row.map(AttendanceRow::into_record).transpose()
}

pub fn attendance_for_day(
    conn: &Connection,
    scope: &Scope,
    date: NaiveDate,
) -> Result<Vec<AttendanceDay>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {ATTENDANCE_COLUMNS}
        FROM attendance
        WHERE tenant_id = ? AND user_id = ? AND date = ?
        ORDER BY rowid ASC
        "
    ))?;
    let rows = stmt.query_map(
        params![scope.tenant.as_str(), scope.user.as_str(), format_date(date)],
        AttendanceRow::from_row,
    )?;
    collect_attendance(rows)
}

/// Hours already booked on `date` by attendance rows other than `exclude`.
pub fn booked_hours_excluding(
    conn: &Connection,
    scope: &Scope,
    date: NaiveDate,
    exclude: &AttendanceId,
) -> Result<f64, DbError> {
    let hours: f64 = conn.query_row(
        "
        SELECT COALESCE(SUM(regular_hours + overtime_hours), 0.0)
        FROM attendance
        WHERE tenant_id = ? AND user_id = ? AND date = ? AND id <> ?
        ",
        params![
            scope.tenant.as_str(),
            scope.user.as_str(),
            format_date(date),
            exclude.as_str(),
        ],
        |row| row.get(0),
    )?;
    Ok(hours)
}

pub fn insert_attendance(conn: &Connection, day: &AttendanceDay) -> Result<(), DbError> {
    conn.execute(
        &format!(
            "
            INSERT INTO attendance ({ATTENDANCE_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "
        ),
        params![
            day.id.as_str(),
            day.tenant_id.as_str(),
            day.user_id.as_str(),
            format_date(day.date),
            day.check_in.map(format_timestamp),
            day.check_out.map(format_timestamp),
            day.status.as_str(),
            day.regular_hours,
            day.overtime_hours,
            day.is_present,
        ],
    )?;
    Ok(())
}

/// Writes checkout fields and totals. `check_in` is never written here.
pub fn close_attendance(conn: &Connection, day: &AttendanceDay) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE attendance
        SET check_out = ?, status = ?, regular_hours = ?, overtime_hours = ?, is_present = ?
        WHERE id = ? AND tenant_id = ? AND user_id = ?
        ",
        params![
            day.check_out.map(format_timestamp),
            day.status.as_str(),
            day.regular_hours,
            day.overtime_hours,
            day.is_present,
            day.id.as_str(),
            day.tenant_id.as_str(),
            day.user_id.as_str(),
        ],
    )?;
    Ok(())
}

/// Inserts the day or, if its id already exists, replaces only its totals.
pub fn upsert_attendance_totals(conn: &Connection, day: &AttendanceDay) -> Result<(), DbError> {
    conn.execute(
        &format!(
            "
            INSERT INTO attendance ({ATTENDANCE_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                regular_hours = excluded.regular_hours,
                overtime_hours = excluded.overtime_hours,
                is_present = 1
            "
        ),
        params![
            day.id.as_str(),
            day.tenant_id.as_str(),
            day.user_id.as_str(),
            format_date(day.date),
            day.check_in.map(format_timestamp),
            day.check_out.map(format_timestamp),
            day.status.as_str(),
            day.regular_hours,
            day.overtime_hours,
            day.is_present,
        ],
    )?;
    Ok(())
}

// ========== Timer sessions ==========

/// The scope's running session, whatever its date.
///
/// A session started before midnight can still be paused or ended after it.
pub fn running_session(
    conn: &Connection,
    scope: &Scope,
) -> Result<Option<TimerSession>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {SESSION_COLUMNS}
                FROM timer_sessions
                WHERE tenant_id = ? AND user_id = ? AND status = 'running'
                ORDER BY date DESC, rowid DESC
                LIMIT 1
                "
            ),
            params![scope.tenant.as_str(), scope.user.as_str()],
            SessionRow::from_row,
        )
        .optional()?;
    row.map(SessionRow::into_record).transpose()
}

/// The latest session with `status` on a date.
pub fn latest_session_with_status(
    conn: &Connection,
    scope: &Scope,
    date: NaiveDate,
    status: SessionStatus,
) -> Result<Option<TimerSession>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {SESSION_COLUMNS}
                FROM timer_sessions
                WHERE tenant_id = ? AND user_id = ? AND date = ? AND status = ?
                ORDER BY rowid DESC
                LIMIT 1
                "
            ),
            params![
                scope.tenant.as_str(),
                scope.user.as_str(),
                format_date(date),
                status.as_str()
            ],
            SessionRow::from_row,
        )
        .optional()?;
    row.map(SessionRow::into_record).transpose()
}

/// The latest running or stopped session attached to an attendance day,
/// preferring a running one.
pub fn latest_open_session(
    conn: &Connection,
    scope: &Scope,
    attendance_id: &AttendanceId,
) -> Result<Option<TimerSession>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {SESSION_COLUMNS}
                FROM timer_sessions
                WHERE tenant_id = ? AND user_id = ? AND attendance_id = ?
                    AND status IN ('running', 'stopped')
                ORDER BY status = 'running' DESC, rowid DESC
                LIMIT 1
                "
            ),
            params![scope.tenant.as_str(), scope.user.as_str(), attendance_id.as_str()],
            SessionRow::from_row,
        )
        .optional()?;
    row.map(SessionRow::into_record).transpose()
}

/// All running or stopped sessions attached to an attendance day.
pub fn open_sessions(
    conn: &Connection,
    scope: &Scope,
    attendance_id: &AttendanceId,
) -> Result<Vec<TimerSession>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {SESSION_COLUMNS}
        FROM timer_sessions
        WHERE tenant_id = ? AND user_id = ? AND attendance_id = ?
            AND status IN ('running', 'stopped')
        ORDER BY rowid ASC
        "
    ))?;
    let rows = stmt.query_map(
        params![scope.tenant.as_str(), scope.user.as_str(), attendance_id.as_str()],
        SessionRow::from_row,
    )?;
    collect_sessions(rows)
}

pub fn sessions_for_day(
    conn: &Connection,
    scope: &Scope,
    date: NaiveDate,
) -> Result<Vec<TimerSession>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {SESSION_COLUMNS}
        FROM timer_sessions
        WHERE tenant_id = ? AND user_id = ? AND date = ?
        ORDER BY rowid ASC
        "
    ))?;
    let rows = stmt.query_map(
        params![scope.tenant.as_str(), scope.user.as_str(), format_date(date)],
        SessionRow::from_row,
    )?;
    collect_sessions(rows)
}

/// Sum of `duration_seconds` over the ended sessions of one attendance day.
///
/// Sessions without an attendance row (`attendance_id` NULL) are grouped by
/// date instead.
pub fn ended_seconds(
    conn: &Connection,
    scope: &Scope,
    attendance_id: Option<&AttendanceId>,
    date: NaiveDate,
) -> Result<i64, DbError> {
    let total: i64 = conn.query_row(
        "
        SELECT COALESCE(SUM(duration_seconds), 0)
        FROM timer_sessions
        WHERE tenant_id = ? AND user_id = ? AND date = ? AND attendance_id IS ?
            AND status = 'ended'
        ",
        params![
            scope.tenant.as_str(),
            scope.user.as_str(),
            format_date(date),
            attendance_id.map(AttendanceId::as_str),
        ],
        |row| row.get(0),
    )?;
    Ok(total)
}

pub fn insert_session(conn: &Connection, session: &TimerSession) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!(
            "
            INSERT INTO timer_sessions ({SESSION_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "
        ),
        params![
            session.id.as_str(),
            session.tenant_id.as_str(),
            session.user_id.as_str(),
            session.attendance_id.as_ref().map(AttendanceId::as_str),
            format_date(session.date),
            format_timestamp(session.start_time),
            session.stop_time.map(format_timestamp),
            session.end_time.map(format_timestamp),
            session.duration_seconds,
            session.status.as_str(),
        ],
    )?;
    Ok(())
}

/// Persists the mutable fields of a session after a state transition.
pub fn update_session(conn: &Connection, session: &TimerSession) -> Result<(), rusqlite::Error> {
    conn.execute(
        "
        UPDATE timer_sessions
        SET attendance_id = ?, start_time = ?, stop_time = ?, end_time = ?,
            duration_seconds = ?, status = ?
        WHERE id = ? AND tenant_id = ? AND user_id = ?
        ",
        params![
            session.attendance_id.as_ref().map(AttendanceId::as_str),
            format_timestamp(session.start_time),
            session.stop_time.map(format_timestamp),
            session.end_time.map(format_timestamp),
            session.duration_seconds,
            session.status.as_str(),
            session.id.as_str(),
            session.tenant_id.as_str(),
            session.user_id.as_str(),
        ],
    )?;
    Ok(())
}
