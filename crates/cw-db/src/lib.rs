//! Storage layer for clockwork.
//!
//! Provides persistence for attendance days, timer sessions and tenant
//! settings using `rusqlite`, and the [`Timekeeper`] engine that mutates them.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Concurrent writers should each open their own `Database`; every engine
//! operation runs in a `BEGIN IMMEDIATE` transaction, so writers against the
//! same file serialize on the SQLite write lock (waiting up to
//! [`BUSY_TIMEOUT`]) and the later one re-reads the state the earlier one
//! committed.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format with millisecond
//! precision (e.g., `2024-01-15T10:30:00.000Z`), always UTC. Dates are
//! `YYYY-MM-DD` in the tenant's local calendar.
//!
//! ## Invariants enforced by the schema
//!
//! - At most one `in` attendance row per (tenant, user, date).
//! - At most one `running` timer session per (tenant, user, date).
//! - `attendance.check_in` cannot change once set.

mod engine;
mod report;
mod store;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use cw_core::{AttendanceDay, Scope, StandardWorkHours, TenantId, TimerSession, ValidationError};
use rusqlite::Connection;
use thiserror::Error;

pub use engine::{CheckInStatus, TimekeepingError, Timekeeper, TimerEnded, TimerStatus};
pub use report::{DailyTotal, TotalsSummary};

/// How long a writer waits for another writer's transaction to finish.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp or date could not be parsed.
    #[error("invalid timestamp in {table} row {row_id}: {value}")]
    TimestampParse {
        table: &'static str,
        row_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored identifier or status failed validation.
    #[error("invalid value in {table} row {row_id}")]
    InvalidRow {
        table: &'static str,
        row_id: String,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tenant_settings (
                tenant_id TEXT PRIMARY KEY,
                working_hours REAL,
                updated_at TEXT NOT NULL
            );

            -- Attendance days: one user's presence record for a local date
            -- check_in/check_out: ISO 8601 UTC (e.g., '2024-01-15T09:00:00.000Z')
            -- status: 'in' while the day is open, 'out' afterwards
            CREATE TABLE IF NOT EXISTS attendance (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                check_in TEXT,
                check_out TEXT,
                status TEXT NOT NULL CHECK (status IN ('in', 'out')),
                regular_hours REAL NOT NULL DEFAULT 0 CHECK (regular_hours >= 0),
                overtime_hours REAL NOT NULL DEFAULT 0 CHECK (overtime_hours >= 0),
                is_present INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_attendance_scope_date
                ON attendance(tenant_id, user_id, date);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_attendance_one_open
                ON attendance(tenant_id, user_id, date) WHERE status = 'in';

            CREATE TRIGGER IF NOT EXISTS attendance_check_in_immutable
            BEFORE UPDATE OF check_in ON attendance
            WHEN OLD.check_in IS NOT NULL AND NEW.check_in IS NOT OLD.check_in
            BEGIN
                SELECT RAISE(ABORT, 'attendance.check_in is immutable');
            END;

            -- Timer sessions: start_time is shifted back on resume so that
            -- now - start_time is always the session's total worked time
            CREATE TABLE IF NOT EXISTS timer_sessions (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                attendance_id TEXT,
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                stop_time TEXT,
                end_time TEXT,
                duration_seconds INTEGER NOT NULL DEFAULT 0 CHECK (duration_seconds >= 0),
                status TEXT NOT NULL CHECK (status IN ('running', 'stopped', 'ended')),
                FOREIGN KEY (attendance_id) REFERENCES attendance(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_timer_sessions_attendance
                ON timer_sessions(attendance_id, status);
            CREATE INDEX IF NOT EXISTS idx_timer_sessions_scope_date
                ON timer_sessions(tenant_id, user_id, date);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_timer_sessions_one_running
                ON timer_sessions(tenant_id, user_id, date) WHERE status = 'running';
            ",
        )?;
        Ok(())
    }

    /// Returns the tenant's standard work hours, or the default when unset
    /// or out of range.
    pub fn standard_work_hours(&self, tenant: &TenantId) -> Result<StandardWorkHours, DbError> {
        store::standard_work_hours(&self.conn, tenant)
    }

    /// Stores the tenant's standard work hours.
    pub fn set_standard_work_hours(
        &mut self,
        tenant: &TenantId,
        hours: StandardWorkHours,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO tenant_settings (tenant_id, working_hours, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                working_hours = excluded.working_hours,
                updated_at = excluded.updated_at
            ",
            rusqlite::params![tenant.as_str(), hours.hours(), format_timestamp(now)],
        )?;
        tracing::info!(
            tenant = %tenant,
            hours = hours.hours(),
            "updated working hours"
        );
        Ok(())
    }

    /// Lists a user's attendance rows for a date, oldest check-in first.
    pub fn attendance_for_day(
        &self,
        scope: &Scope,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceDay>, DbError> {
        store::attendance_for_day(&self.conn, scope, date)
    }

    /// Lists a user's timer sessions for a date in creation order.
    pub fn sessions_for_day(
        &self,
        scope: &Scope,
        date: NaiveDate,
    ) -> Result<Vec<TimerSession>, DbError> {
        store::sessions_for_day(&self.conn, scope, date)
    }
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
