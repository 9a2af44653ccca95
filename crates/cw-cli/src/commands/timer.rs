//! Timer commands.

use std::io::Write;

use anyhow::Result;
use cw_core::hours::{round_to, seconds_to_hours};
use cw_core::{Clock, HoursSplit, REPORT_PRECISION, Scope, TimerSession};
use cw_db::{Timekeeper, TimerEnded, TimerStatus};
use serde::Serialize;

use crate::TimerAction;

use super::output::{AttendanceView, ElapsedView, SessionView, write_outcome};

#[derive(Debug, Serialize)]
struct EndedView {
    session: SessionView,
    attendance: AttendanceView,
    total_seconds: i64,
    total_hours: f64,
    day_hours: HoursSplit,
}

impl From<&TimerEnded> for EndedView {
    fn from(ended: &TimerEnded) -> Self {
        Self {
            session: SessionView::from(&ended.session),
            attendance: AttendanceView::from(&ended.attendance),
            total_seconds: ended.total_seconds,
            total_hours: round_to(seconds_to_hours(ended.total_seconds), REPORT_PRECISION),
            day_hours: ended.day_hours.reported(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum StatusView {
    #[serde(rename = "no_checkin")]
    NoCheckIn,
    NotStarted {
        banked_seconds: i64,
    },
    Active {
        session: SessionView,
        elapsed: ElapsedView,
        banked_seconds: i64,
        is_overtime: bool,
    },
}

impl From<&TimerStatus> for StatusView {
    fn from(status: &TimerStatus) -> Self {
        match status {
            TimerStatus::NoCheckIn => Self::NoCheckIn,
            TimerStatus::NotStarted { banked_seconds } => Self::NotStarted {
                banked_seconds: *banked_seconds,
            },
            TimerStatus::Active {
                session,
                elapsed,
                banked_seconds,
                is_overtime,
            } => Self::Active {
                session: SessionView::from(session),
                elapsed: ElapsedView::from(*elapsed),
                banked_seconds: *banked_seconds,
                is_overtime: *is_overtime,
            },
        }
    }
}

/// Runs one timer subcommand.
pub fn run<W: Write, C: Clock>(
    writer: &mut W,
    timekeeper: &mut Timekeeper<'_, C>,
    scope: &Scope,
    action: &TimerAction,
) -> Result<()> {
    let session_view = |session: &TimerSession| SessionView::from(session);
    let ended_view = |ended: &TimerEnded| EndedView::from(ended);
    let status_view = |status: &TimerStatus| StatusView::from(status);
    match action {
        TimerAction::Start => write_outcome(writer, timekeeper.timer_start(scope), session_view),
        TimerAction::Stop => write_outcome(writer, timekeeper.timer_stop(scope), session_view),
        TimerAction::Resume => write_outcome(writer, timekeeper.timer_resume(scope), session_view),
        TimerAction::End => write_outcome(writer, timekeeper.timer_end(scope), ended_view),
        TimerAction::Status => write_outcome(writer, timekeeper.timer_status(scope), status_view),
    }
}
