//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{FixedOffset, Local, Offset};
use cw_core::{Scope, TenantId, UserId};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Default tenant for commands.
    pub tenant: Option<String>,

    /// Default user for commands.
    pub user: Option<String>,

    /// Tenant timezone as a UTC offset, e.g. `+02:00`. Defaults to the
    /// machine's local offset.
    pub utc_offset: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("cw.db"),
            tenant: None,
            user: None,
            utc_offset: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CW_*)
        figment = figment.merge(Env::prefixed("CW_"));

        figment.extract()
    }

    /// Resolves the tenant, letting the flag override the config file.
    pub fn tenant(&self, tenant: Option<&str>) -> anyhow::Result<TenantId> {
        let tenant = tenant
            .or(self.tenant.as_deref())
            .context("no tenant configured; pass --tenant or set CW_TENANT")?;
        Ok(TenantId::new(tenant)?)
    }

    /// Resolves the acting scope, letting flags override the config file.
    pub fn scope(&self, tenant: Option<&str>, user: Option<&str>) -> anyhow::Result<Scope> {
        let user = user
            .or(self.user.as_deref())
            .context("no user configured; pass --user or set CW_USER")?;
        Ok(Scope::new(self.tenant(tenant)?, UserId::new(user)?))
    }

    /// The tenant's UTC offset.
    pub fn offset(&self) -> anyhow::Result<FixedOffset> {
        match self.utc_offset.as_deref() {
            Some(raw) => raw
                .parse::<FixedOffset>()
                .with_context(|| format!("invalid utc_offset: {raw}")),
            None => Ok(Local::now().offset().fix()),
        }
    }
}

/// Returns the platform-specific config directory for cw.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cw"))
}

/// Returns the platform-specific data directory for cw.
///
/// On Linux: `~/.local/share/cw`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("cw"))
}
