//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Attendance and overtime tracker.
///
/// Records check-ins, timer sessions and the regular/overtime split of each
/// working day.
#[derive(Debug, Parser)]
#[command(name = "cw", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Tenant to act for (overrides config).
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// User to act as (overrides config).
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Pin "now" (ISO 8601 or e.g. "2 hours ago").
    #[arg(long, global = true)]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open today's attendance day.
    CheckIn,

    /// Close today's attendance day and compute its hours.
    CheckOut,

    /// Show whether you are checked in and for how long.
    Status,

    /// Start, pause, resume or end the work timer.
    #[command(subcommand)]
    Timer(TimerAction),

    /// Show per-day regular and overtime hours.
    Report {
        /// First date to include (default: six days before today).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to include (default: today).
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show or change tenant settings.
    #[command(subcommand)]
    Settings(SettingsAction),
}

/// Timer subcommands.
#[derive(Debug, Subcommand)]
pub enum TimerAction {
    /// Start a new session.
    Start,
    /// Pause the running session.
    Stop,
    /// Resume today's paused session.
    Resume,
    /// End the running session and update the day totals.
    End,
    /// Show the current session.
    Status,
}

/// Settings subcommands.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Show the tenant's settings.
    Show,
    /// Set the tenant's standard work hours per day (1-24).
    SetHours {
        /// Hours per day.
        hours: f64,
    },
}
