//! # Application Configuration
//!
//! ## Load Order (later overrides earlier)
//! 1. Default values
//! 2. Config file (`stockline.toml`)
//! 3. Environment variables (`STOCKLINE_*`)
//!
//! ## Config File Location
//! `--config <path>` or `STOCKLINE_CONFIG`; otherwise the platform config
//! directory (`~/.config/stockline/stockline.toml` on Linux). An explicit
//! path must exist; the default one is optional.
//!
//! ```toml
//! [database]
//! path = "/var/lib/stockline/stockline.db"
//! max_connections = 5
//!
//! [gateway]
//! base_url = "https://api.paystack.co"
//! secret_key = "sk_live_..."
//! timeout_secs = 10
//!
//! [checkout]
//! verify_timeout_secs = 15
//! reconcile_amount = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use stockline_checkout::CheckoutSettings;
use stockline_payments::{GatewayConfig, Secret};

// =============================================================================
// Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine a data directory; set STOCKLINE_DB_PATH")]
    NoDataDir,
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub base_url: String,
    pub secret_key: Secret<String>,
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            base_url: "https://api.paystack.co".to_string(),
            secret_key: Secret::default(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckoutSection {
    pub verify_timeout_secs: u64,
    pub reconcile_amount: bool,
}

impl Default for CheckoutSection {
    fn default() -> Self {
        CheckoutSection {
            verify_timeout_secs: 15,
            reconcile_amount: true,
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub gateway: GatewaySettings,
    pub checkout: CheckoutSection,
}

impl AppConfig {
    /// Loads file, then process environment, then validates.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `STOCKLINE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("STOCKLINE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(url) = lookup("STOCKLINE_GATEWAY_URL") {
            debug!(url = %url, "Overriding gateway URL from environment");
            self.gateway.base_url = url;
        }

        if let Some(secret) = lookup("STOCKLINE_GATEWAY_SECRET") {
            self.gateway.secret_key = Secret::from(secret);
        }

        if let Some(value) = lookup("STOCKLINE_VERIFY_TIMEOUT_SECS") {
            self.checkout.verify_timeout_secs = parse_env("STOCKLINE_VERIFY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = lookup("STOCKLINE_RECONCILE_AMOUNT") {
            self.checkout.reconcile_amount = parse_env("STOCKLINE_RECONCILE_AMOUNT", &value)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be greater than 0".into()));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Invalid("gateway.timeout_secs must be greater than 0".into()));
        }

        if self.checkout.verify_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "checkout.verify_timeout_secs must be greater than 0".into(),
            ));
        }

        if !self.gateway.base_url.starts_with("http://") && !self.gateway.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "gateway.base_url must start with http:// or https://, got: {}",
                self.gateway.base_url
            )));
        }

        Ok(())
    }

    /// Gateway settings for commands that talk to the provider.
    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        if self.gateway.secret_key.is_empty() {
            return Err(ConfigError::MissingRequired(
                "gateway.secret_key (or STOCKLINE_GATEWAY_SECRET)".into(),
            ));
        }

        Ok(GatewayConfig {
            base_url: self.gateway.base_url.clone(),
            secret_key: self.gateway.secret_key.clone(),
            timeout: Duration::from_secs(self.gateway.timeout_secs),
        })
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            reconcile_amount: self.checkout.reconcile_amount,
            verify_timeout: Duration::from_secs(self.checkout.verify_timeout_secs),
        }
    }

    /// Configured database file, else `<data dir>/stockline.db`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "stockline", "stockline").ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        Ok(data_dir.join("stockline.db"))
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "stockline", "stockline").map(|dirs| dirs.config_dir().join("stockline.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
