//! CLI subcommand implementations.

pub mod attendance;
pub mod output;
pub mod report;
pub mod settings;
pub mod timer;
pub mod util;
