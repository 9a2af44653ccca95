//! Core domain logic for clockwork.
//!
//! This crate contains the fundamental types and logic for:
//! - Attendance days and timer sessions, including the pause/resume state machine
//! - Hours split: dividing worked time into regular and overtime buckets
//! - Elapsed-time arithmetic and the injectable clock

pub mod attendance;
pub mod clock;
pub mod elapsed;
pub mod hours;
pub mod timer;
pub mod types;

pub use attendance::AttendanceDay;
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use elapsed::{Elapsed, clamped_seconds};
pub use hours::{HoursSplit, REPORT_PRECISION, STORAGE_PRECISION, StandardWorkHours};
pub use timer::{TimerSession, TransitionError};
pub use types::{
    AttendanceId, AttendanceStatus, Scope, SessionId, SessionStatus, TenantId, UserId,
    ValidationError,
};
