//! Timekeeping engine.
//!
//! Owns the lifecycle of a user's attendance day and its timer sessions.
//! Every mutating operation runs inside one `BEGIN IMMEDIATE` transaction:
//! either all of its row changes commit or none do. Precondition failures
//! are returned as [`TimekeepingError`] rejections after the transaction has
//! been rolled back; only storage failures are hard errors.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use cw_core::hours::seconds_to_hours;
use cw_core::{
    AttendanceDay, AttendanceId, Clock, Elapsed, HoursSplit, Scope, SessionId, SessionStatus,
    StandardWorkHours, TimerSession, TransitionError, clamped_seconds,
};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use thiserror::Error;

use crate::{Database, DbError, store};

/// Why a timekeeping operation did not take effect.
#[derive(Debug, Error)]
pub enum TimekeepingError {
    #[error("already checked in today")]
    AlreadyCheckedIn,
    #[error("no active check-in found for today")]
    NoActiveCheckIn,
    #[error("a timer is already running")]
    TimerAlreadyRunning,
    #[error("no running timer")]
    NoRunningTimer,
    #[error("no paused timer to resume")]
    NoStoppedTimer,
    /// The transaction failed and was rolled back.
    #[error("storage failure: {0}")]
    Storage(#[from] DbError),
}

impl TimekeepingError {
    /// Business-rule rejections are expected outcomes, not failures.
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl From<rusqlite::Error> for TimekeepingError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(err))
    }
}

impl From<TransitionError> for TimekeepingError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotRunning { .. } => Self::NoRunningTimer,
            TransitionError::NotStopped { .. } => Self::NoStoppedTimer,
        }
    }
}

/// Result of ending a timer: the ended session and the recomputed day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerEnded {
    pub session: TimerSession,
    pub attendance: AttendanceDay,
    /// Ended session seconds on `attendance`.
    pub total_seconds: i64,
    /// The whole date's split, across every attendance row on it.
    pub day_hours: HoursSplit,
}

/// Snapshot of a user's check-in state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInStatus {
    pub checked_in: bool,
    pub attendance: Option<AttendanceDay>,
    pub elapsed: Option<Elapsed>,
    pub is_overtime: bool,
    pub standard_work_hours: StandardWorkHours,
}

/// Snapshot of a user's timer for polling UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state")]
pub enum TimerStatus {
    /// No open attendance day.
    #[serde(rename = "no_checkin")]
    NoCheckIn,
    /// Checked in, but no running or paused session.
    #[serde(rename = "not_started")]
    NotStarted { banked_seconds: i64 },
    /// The latest running or paused session.
    #[serde(rename = "active")]
    Active {
        session: TimerSession,
        elapsed: Elapsed,
        banked_seconds: i64,
        is_overtime: bool,
    },
}

/// Runs timekeeping operations for one database, clock and timezone.
///
/// `offset` decides which local calendar date "now" falls on.
pub struct Timekeeper<'db, C> {
    db: &'db mut Database,
    clock: C,
    offset: FixedOffset,
}

impl<'db, C: Clock> Timekeeper<'db, C> {
    /// A timekeeper whose dates are UTC dates.
    pub fn new(db: &'db mut Database, clock: C) -> Self {
        Self {
            db,
            clock,
            offset: Utc.fix(),
        }
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// The local date `now` falls on.
    pub fn date_of(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Opens an attendance day.
    pub fn check_in(&mut self, scope: &Scope) -> Result<AttendanceDay, TimekeepingError> {
        let now = self.clock.now();
        let date = self.date_of(now);
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if store::open_attendance(&tx, scope, date)?.is_some() {
            return Err(TimekeepingError::AlreadyCheckedIn);
        }
        let day = AttendanceDay::check_in(AttendanceId::generate(), scope, date, now);
        store::insert_attendance(&tx, &day)?;
        tx.commit()?;

        tracing::debug!(%scope, attendance_id = %day.id, %date, "checked in");
        Ok(day)
    }

    /// Closes the open attendance day.
    ///
    /// Hours come from the day's ended timer sessions. A day that never used
    /// the timer is split from check-in to now instead. Sessions still
    /// running or paused are ended first so none outlives the day.
    ///
    /// Earlier check-ins on the same date use up the threshold first.
    pub fn check_out(&mut self, scope: &Scope) -> Result<AttendanceDay, TimekeepingError> {
        let now = self.clock.now();
        let date = self.date_of(now);
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut day = store::open_attendance(&tx, scope, date)?
            .ok_or(TimekeepingError::NoActiveCheckIn)?;
        let standard = store::standard_work_hours(&tx, &scope.tenant)?;

        for mut session in store::open_sessions(&tx, scope, &day.id)? {
            session.close(now);
            store::update_session(&tx, &session)?;
            tracing::debug!(
                %scope,
                session_id = %session.id,
                "closed session at checkout"
            );
        }

        let timer_seconds = store::ended_seconds(&tx, scope, Some(&day.id), day.date)?;
        let worked_seconds = if timer_seconds > 0 {
            timer_seconds
        } else {
            day.check_in
                .map_or(0, |check_in| clamped_seconds(check_in, now))
        };
        let booked = store::booked_hours_excluding(&tx, scope, day.date, &day.id)?;
        let split = HoursSplit::with_allowance(seconds_to_hours(worked_seconds), booked, standard);

        day.check_out(now, split);
        store::close_attendance(&tx, &day)?;
        tx.commit()?;

        tracing::info!(
            %scope,
            attendance_id = %day.id,
            regular_hours = day.regular_hours,
            overtime_hours = day.overtime_hours,
            from_timer = timer_seconds > 0,
            "checked out"
        );
        Ok(day)
    }

    /// Starts a new running session on the open attendance day.
    pub fn timer_start(&mut self, scope: &Scope) -> Result<TimerSession, TimekeepingError> {
        let now = self.clock.now();
        let date = self.date_of(now);
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let day = store::open_attendance(&tx, scope, date)?
            .ok_or(TimekeepingError::NoActiveCheckIn)?;
        if running_on(&tx, scope, day.date)?.is_some() {
            return Err(TimekeepingError::TimerAlreadyRunning);
        }

        let session = TimerSession::start(SessionId::generate(), scope, Some(day.id), date, now);
        store::insert_session(&tx, &session).map_err(running_conflict)?;
        tx.commit()?;

        tracing::debug!(%scope, session_id = %session.id, "timer started");
        Ok(session)
    }

    /// Pauses the running session.
    pub fn timer_stop(&mut self, scope: &Scope) -> Result<TimerSession, TimekeepingError> {
        let now = self.clock.now();
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut session =
            store::running_session(&tx, scope)?.ok_or(TimekeepingError::NoRunningTimer)?;
        session.stop(now)?;
        store::update_session(&tx, &session)?;
        tx.commit()?;

        tracing::debug!(
            %scope,
            session_id = %session.id,
            duration_seconds = session.duration_seconds,
            "timer paused"
        );
        Ok(session)
    }

    /// Resumes today's most recently paused session.
    pub fn timer_resume(&mut self, scope: &Scope) -> Result<TimerSession, TimekeepingError> {
        let now = self.clock.now();
        let date = self.date_of(now);
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if store::running_session(&tx, scope)?.is_some() {
            return Err(TimekeepingError::TimerAlreadyRunning);
        }
        let mut session =
            store::latest_session_with_status(&tx, scope, date, SessionStatus::Stopped)?
                .ok_or(TimekeepingError::NoStoppedTimer)?;
        session.resume(now)?;
        store::update_session(&tx, &session).map_err(running_conflict)?;
        tx.commit()?;

        tracing::debug!(
            %scope,
            session_id = %session.id,
            accumulated_seconds = session.duration_seconds,
            "timer resumed"
        );
        Ok(session)
    }

    /// Ends the running session and recomputes the day totals.
    ///
    /// The attendance row gets its ended session seconds, split against the
    /// part of the threshold other rows on the date have not used. The
    /// session update and the attendance upsert commit together.
    pub fn timer_end(&mut self, scope: &Scope) -> Result<TimerEnded, TimekeepingError> {
        let now = self.clock.now();
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut session =
            store::running_session(&tx, scope)?.ok_or(TimekeepingError::NoRunningTimer)?;
        let previous_seconds =
            store::ended_seconds(&tx, scope, session.attendance_id.as_ref(), session.date)?;
        session.end(now)?;
        let total_seconds = previous_seconds + session.duration_seconds;

        let existing = match &session.attendance_id {
            Some(id) => store::attendance_by_id(&tx, scope, id)?,
            None => store::latest_attendance(&tx, scope, session.date)?,
        };
        let mut attendance = existing.unwrap_or_else(|| {
            let id = session
                .attendance_id
                .clone()
                .unwrap_or_else(AttendanceId::generate);
            AttendanceDay::from_timer_totals(id, scope, session.date, HoursSplit::default())
        });

        let standard = store::standard_work_hours(&tx, &scope.tenant)?;
        let booked = store::booked_hours_excluding(&tx, scope, attendance.date, &attendance.id)?;
        let row_hours = seconds_to_hours(total_seconds);
        attendance.apply_hours(HoursSplit::with_allowance(row_hours, booked, standard));
        let day_hours = HoursSplit::compute(booked + row_hours, standard);

        store::upsert_attendance_totals(&tx, &attendance)?;
        store::update_session(&tx, &session)?;
        tx.commit()?;

        tracing::info!(
            %scope,
            session_id = %session.id,
            attendance_id = %attendance.id,
            total_seconds,
            regular_hours = attendance.regular_hours,
            overtime_hours = attendance.overtime_hours,
            day_overtime_hours = day_hours.overtime_hours,
            "timer ended"
        );
        Ok(TimerEnded {
            session,
            attendance,
            total_seconds,
            day_hours,
        })
    }

    /// Whether the user is checked in today and for how long.
    pub fn status(&self, scope: &Scope) -> Result<CheckInStatus, TimekeepingError> {
        let now = self.clock.now();
        let date = self.date_of(now);
        let conn = &self.db.conn;

        let standard = store::standard_work_hours(conn, &scope.tenant)?;
        let attendance = store::open_attendance(conn, scope, date)?;
        let elapsed = attendance
            .as_ref()
            .and_then(|day| day.check_in)
            .map(|check_in| Elapsed::between(check_in, now));
        let is_overtime = elapsed.is_some_and(|e| e.total_seconds >= standard.as_seconds());

        Ok(CheckInStatus {
            checked_in: attendance.is_some(),
            attendance,
            elapsed,
            is_overtime,
            standard_work_hours: standard,
        })
    }

    /// The timer state of today's open attendance day.
    pub fn timer_status(&self, scope: &Scope) -> Result<TimerStatus, TimekeepingError> {
        let now = self.clock.now();
        let date = self.date_of(now);
        let conn = &self.db.conn;

        let Some(day) = store::open_attendance(conn, scope, date)? else {
            return Ok(TimerStatus::NoCheckIn);
        };
        let banked_seconds = store::ended_seconds(conn, scope, Some(&day.id), day.date)?;
        let Some(session) = store::latest_open_session(conn, scope, &day.id)? else {
            return Ok(TimerStatus::NotStarted { banked_seconds });
        };

        let standard = store::standard_work_hours(conn, &scope.tenant)?;
        let elapsed = Elapsed::from_seconds(session.elapsed_seconds(now));
        let is_overtime = banked_seconds + elapsed.total_seconds >= standard.as_seconds();
        Ok(TimerStatus::Active {
            session,
            elapsed,
            banked_seconds,
            is_overtime,
        })
    }
}

/// A running session dated `date`, if any.
fn running_on(
    conn: &Connection,
    scope: &Scope,
    date: NaiveDate,
) -> Result<Option<TimerSession>, DbError> {
    store::latest_session_with_status(conn, scope, date, SessionStatus::Running)
}

/// Maps a hit on the one-running-session index to the business rejection.
fn running_conflict(err: rusqlite::Error) -> TimekeepingError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            TimekeepingError::TimerAlreadyRunning
        }
        _ => err.into(),
    }
}
