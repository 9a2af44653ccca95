use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cw_core::{Clock, FixedClock, SystemClock};
use cw_db::{Database, Timekeeper};
use tracing_subscriber::EnvFilter;

use cw_cli::commands::{attendance, report, settings, timer, util};
use cw_cli::{Cli, Commands, Config, SettingsAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

/// The clock for this invocation, pinned when `--at` is given.
fn clock_for(at: Option<&str>) -> Result<Box<dyn Clock>> {
    match at {
        Some(raw) => {
            let now = util::parse_datetime(raw, SystemClock.now())?;
            tracing::debug!(%now, "pinned clock");
            Ok(Box::new(FixedClock(now)))
        }
        None => Ok(Box::new(SystemClock)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let clock = clock_for(cli.at.as_deref())?;
    let offset = config.offset()?;
    let mut stdout = io::stdout().lock();

    let scope = || config.scope(cli.tenant.as_deref(), cli.user.as_deref());

    match command {
        Commands::CheckIn => {
            let mut timekeeper = Timekeeper::new(&mut db, clock.as_ref()).with_offset(offset);
            attendance::check_in(&mut stdout, &mut timekeeper, &scope()?)?;
        }
        Commands::CheckOut => {
            let mut timekeeper = Timekeeper::new(&mut db, clock.as_ref()).with_offset(offset);
            attendance::check_out(&mut stdout, &mut timekeeper, &scope()?)?;
        }
        Commands::Status => {
            let timekeeper = Timekeeper::new(&mut db, clock.as_ref()).with_offset(offset);
            attendance::status(&mut stdout, &timekeeper, &scope()?)?;
        }
        Commands::Timer(action) => {
            let mut timekeeper = Timekeeper::new(&mut db, clock.as_ref()).with_offset(offset);
            timer::run(&mut stdout, &mut timekeeper, &scope()?, action)?;
        }
        Commands::Report { from, to, json } => {
            let today = clock.now().with_timezone(&offset).date_naive();
            let range = report::resolve_range(*from, *to, today);
            report::run(&mut stdout, &db, &scope()?, range, *json)?;
        }
        Commands::Settings(action) => {
            let tenant = config.tenant(cli.tenant.as_deref())?;
            match action {
                SettingsAction::Show => settings::show(&mut stdout, &db, &tenant)?,
                SettingsAction::SetHours { hours } => {
                    settings::set_hours(&mut stdout, &mut db, &tenant, *hours, clock.now())?;
                }
            }
        }
    }

    Ok(())
}
