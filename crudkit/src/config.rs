//! Explicit application configuration.
//!
//! Loaded once at start-up and passed to whoever needs it; nothing here is global.
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `crudkit.toml` in the working directory (or the file given to [`AppConfig::load_from`])
//! 3. `CRUDKIT_`-prefixed environment variables, `__` separating sections:
//!    `CRUDKIT_PAGINATION__MAX_LIMIT=50`, `CRUDKIT_DATABASE__URL=postgres://...`

use std::fmt;
use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde::{Deserialize, Serialize};

use crate::pagination::{
    DEFAULT_LIMIT, DEFAULT_MAX_LIMIT, DEFAULT_ORDER, DEFAULT_TIMEZONE, PaginationOptions, Timezone,
};

pub const CONFIG_FILE: &str = "crudkit.toml";
pub const ENV_PREFIX: &str = "CRUDKIT_";

#[derive(Debug)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape
    Figment(Box<figment::Error>),
    /// `pagination.timezone` is neither an IANA zone name nor a `±HH:MM` offset
    InvalidTimezone(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Figment(err) => write!(f, "invalid configuration: {err}"),
            Self::InvalidTimezone(tz) => write!(f, "invalid timezone '{tz}'"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Figment(err) => Some(err.as_ref()),
            Self::InvalidTimezone(_) => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
}

impl AppConfig {
    /// Defaults, then `crudkit.toml` if present, then the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] when a source has the wrong shape.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Like [`load`](Self::load) with an explicit file. A missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] when a source has the wrong shape.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading configuration");

        let config = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    /// Log every statement through sqlx
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 30,
            sqlx_logging: false,
        }
    }
}

impl DatabaseConfig {
    /// Open a connection pool.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the database cannot be reached.
    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_seconds))
            .sqlx_logging(self.sqlx_logging);

        tracing::info!(
            max_connections = self.max_connections,
            "Connecting to database"
        );
        Database::connect(options).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u64,
    pub max_limit: u64,
    pub default_order: String,
    /// Zone used to read DATE and DATETIME filter values: `Asia/Jakarta` or `+07:00`
    pub timezone: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            default_order: DEFAULT_ORDER.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl PaginationConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimezone`] when `timezone` is not a zone name or offset.
    pub fn to_options(&self) -> Result<PaginationOptions, ConfigError> {
        let timezone = self
            .timezone
            .parse::<Timezone>()
            .map_err(|err| ConfigError::InvalidTimezone(err.0))?;
        Ok(PaginationOptions {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            default_order: self.default_order.clone(),
            timezone: Some(timezone),
        })
    }
}
