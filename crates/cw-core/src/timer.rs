//! Timer sessions and their state machine.
//!
//! ```text
//!            stop              end
//!  running ───────► stopped    running ───► ended
//!     ▲                │
//!     └────── resume ──┘
//! ```
//!
//! `duration_seconds` is a cached value: it is always recomputed from
//! `start_time` when a running session stops or ends. Resuming shifts
//! `start_time` back by the accumulated duration so the running clock keeps
//! counting from where it paused.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::elapsed::clamped_seconds;
use crate::types::{AttendanceId, Scope, SessionId, SessionStatus, TenantId, UserId};

/// An illegal state transition was requested.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Stop or end needs a running session.
    #[error("session is {status}, not running")]
    NotRunning { status: SessionStatus },
    /// Resume needs a stopped session.
    #[error("session is {status}, not stopped")]
    NotStopped { status: SessionStatus },
}

/// One contiguous, possibly paused and resumed, span of logged work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSession {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub attendance_id: Option<AttendanceId>,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub status: SessionStatus,
}

impl TimerSession {
    /// A freshly started, running session.
    pub fn start(
        id: SessionId,
        scope: &Scope,
        attendance_id: Option<AttendanceId>,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id: scope.tenant.clone(),
            user_id: scope.user.clone(),
            attendance_id,
            date,
            start_time: now,
            stop_time: None,
            end_time: None,
            duration_seconds: 0,
            status: SessionStatus::Running,
        }
    }

    /// Pauses a running session.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_running()?;
        self.duration_seconds = clamped_seconds(self.start_time, now);
        self.stop_time = Some(now);
        self.status = SessionStatus::Stopped;
        Ok(())
    }

    /// Resumes a paused session.
    ///
    /// The new `start_time` is `now - accumulated`, so a later stop or end
    /// yields the total across all running spans.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != SessionStatus::Stopped {
            return Err(TransitionError::NotStopped {
                status: self.status,
            });
        }
        let accumulated = self.accumulated_seconds();
        self.start_time = now - Duration::seconds(accumulated);
        self.stop_time = None;
        self.status = SessionStatus::Running;
        Ok(())
    }

    /// Terminally ends a running session.
    pub fn end(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_running()?;
        self.duration_seconds = clamped_seconds(self.start_time, now);
        self.end_time = Some(now);
        self.status = SessionStatus::Ended;
        Ok(())
    }

    /// Ends the session regardless of whether it is running or paused.
    ///
    /// A paused session ends at its stop time with the duration it had
    /// accumulated. Ending an already-ended session is a no-op.
    pub fn close(&mut self, now: DateTime<Utc>) {
        match self.status {
            SessionStatus::Running => {
                self.duration_seconds = clamped_seconds(self.start_time, now);
                self.end_time = Some(now);
            }
            SessionStatus::Stopped => {
                self.duration_seconds = self.accumulated_seconds();
                self.end_time = Some(self.stop_time.unwrap_or(now));
            }
            SessionStatus::Ended => return,
        }
        self.status = SessionStatus::Ended;
    }

    /// Seconds of work this session represents at `now`.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        match self.status {
            SessionStatus::Running => clamped_seconds(self.start_time, now),
            SessionStatus::Stopped | SessionStatus::Ended => self.duration_seconds.max(0),
        }
    }

    pub const fn is_running(&self) -> bool {
        matches!(self.status, SessionStatus::Running)
    }

    const fn ensure_running(&self) -> Result<(), TransitionError> {
        if matches!(self.status, SessionStatus::Running) {
            Ok(())
        } else {
            Err(TransitionError::NotRunning {
                status: self.status,
            })
        }
    }

    /// Duration banked while paused. Older rows may carry a zero cache, in
    /// which case it is rebuilt from the stop and start instants.
    fn accumulated_seconds(&self) -> i64 {
        if self.duration_seconds > 0 {
            return self.duration_seconds;
        }
        self.stop_time
            .map_or(0, |stop| clamped_seconds(self.start_time, stop))
    }
}
