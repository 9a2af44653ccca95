//! Attendance and overtime tracker CLI library.
//!
//! This crate provides the CLI interface for the timekeeping engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, SettingsAction, TimerAction};
pub use config::Config;
