//! Server configuration.
//!
//! Loaded from a TOML file, then overridden by `DEPOT_*` environment
//! variables. The file is looked up in order: the `--config` flag (or
//! `$DEPOT_CONFIG`), then `<config_dir>/depot/config.toml`. A missing
//! default file means built-in defaults; a missing explicit file is an error.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use depot_acl::AclConfig;
use depot_auth::{AuthConfig, WarehouseAccessConfig};
use depot_mysql::DatabaseConfig;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Project name used for the config directory.
pub const PROJECT_NAME: &str = "depot";

// ============================================================================
// Sections
// ============================================================================

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address.
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Whether bearer tokens are required.
    pub enabled: bool,
    /// HS256 signing secret shared with the login service.
    pub jwt_secret: String,
    /// Expected `iss` claim.
    pub issuer: Option<String>,
}

impl AuthSection {
    /// The middleware configuration.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            enabled: self.enabled,
            issuer: self.issuer.clone(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings.
    pub server: ServerSection,
    /// Database connection.
    pub database: DatabaseConfig,
    /// Token validation.
    pub auth: AuthSection,
    /// Permission engine tunables.
    pub acl: AclConfig,
    /// Where requests carry warehouse ids.
    pub warehouse: WarehouseAccessConfig,
    /// Log filtering.
    pub logging: LoggingSection,
}

impl ServerConfig {
    /// The default config file location for this platform.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(PROJECT_NAME).join("config.toml"))
    }

    /// The config file that would be read for `explicit`.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::default_config_path(),
        }
    }

    /// Loads configuration from file and process environment.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if explicit.is_some() => {
                return Err(Error::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Applies `DEPOT_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DEPOT_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(bind) = lookup("DEPOT_BIND") {
            self.server.bind = bind;
        }
        if let Some(secret) = lookup("DEPOT_JWT_SECRET") {
            self.auth.jwt_secret = secret;
            self.auth.enabled = true;
        }
        if let Some(level) = lookup("DEPOT_LOG") {
            self.logging.level = level;
        }
    }

    /// Rejects settings the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.auth.enabled && self.auth.jwt_secret.is_empty() {
            return Err(Error::config(
                "auth.enabled requires auth.jwt_secret (or DEPOT_JWT_SECRET)",
            ));
        }
        if self.warehouse.max_body_bytes == 0 {
            return Err(Error::config("warehouse.max_body_bytes must be greater than 0"));
        }
        self.acl.validate()?;
        Ok(())
    }

    /// The parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| Error::config(format!("invalid server.bind '{}': {e}", self.server.bind)))
    }

    /// The configuration as TOML with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.auth.jwt_secret.is_empty() {
            shown.auth.jwt_secret = "***".to_string();
        }
        shown.database.url = shown.database.redacted_url();
        toml::to_string_pretty(&shown).map_err(|e| Error::config(e.to_string()))
    }
}
