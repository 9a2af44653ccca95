//! Tenant settings commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cw_core::{StandardWorkHours, TenantId};
use cw_db::Database;
use serde::Serialize;

use super::output::{write_failure, write_success};

#[derive(Debug, Serialize)]
struct SettingsView<'a> {
    tenant: &'a str,
    standard_work_hours: f64,
}

pub fn show<W: Write>(writer: &mut W, db: &Database, tenant: &TenantId) -> Result<()> {
    let hours = db
        .standard_work_hours(tenant)
        .context("failed to read tenant settings")?;
    write_success(
        writer,
        &SettingsView {
            tenant: tenant.as_str(),
            standard_work_hours: hours.hours(),
        },
    )
}

/// Stores new standard work hours. Out-of-range values are rejected
/// without touching the database.
pub fn set_hours<W: Write>(
    writer: &mut W,
    db: &mut Database,
    tenant: &TenantId,
    hours: f64,
    now: DateTime<Utc>,
) -> Result<()> {
    let hours = match StandardWorkHours::new(hours) {
        Ok(hours) => hours,
        Err(err) => return write_failure(writer, &err.to_string()),
    };
    db.set_standard_work_hours(tenant, hours, now)
        .context("failed to update tenant settings")?;
    write_success(
        writer,
        &SettingsView {
            tenant: tenant.as_str(),
            standard_work_hours: hours.hours(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use serde_json::Value;

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn show_reports_default_hours() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        show(&mut output, &db, &tenant()).unwrap();

        let json: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["data"]["tenant"], "acme");
        assert_eq!(json["data"]["standard_work_hours"], 8.0);
    }

    #[test]
    fn set_hours_persists_valid_value() {
        let mut db = Database::open_in_memory().unwrap();
        set_hours(&mut Vec::new(), &mut db, &tenant(), 7.5, now()).unwrap();

        assert!((db.standard_work_hours(&tenant()).unwrap().hours() - 7.5).abs() < 1e-9);
    }

    #[test]
    fn set_hours_rejects_out_of_range() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        set_hours(&mut output, &mut db, &tenant(), 30.0, now()).unwrap();

        let json: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("between 1 and 24"));
        assert!((db.standard_work_hours(&tenant()).unwrap().hours() - 8.0).abs() < 1e-9);
    }
}
