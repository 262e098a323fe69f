//! Ledger configuration
//!
//! Built once at startup and handed to [`crate::ServiceContext`]. Every field
//! has a default; a JSON file and `POINTS_*` environment variables can
//! override them.

use points_persistence::PoolSettings;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Configuration for the ledger services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Normal balance granted to a newly registered account
    #[serde(default = "default_normal_balance")]
    pub default_normal_balance: Decimal,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a write waits for the database lock before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Refuse login until the email address is confirmed
    #[serde(default = "default_require_email_confirmation")]
    pub require_email_confirmation: bool,
}

fn default_database_url() -> String {
    "sqlite:data/points.db?mode=rwc".to_string()
}

fn default_normal_balance() -> Decimal {
    Decimal::new(100, 0)
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_require_email_confirmation() -> bool {
    true
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            default_normal_balance: default_normal_balance(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
            require_email_confirmation: default_require_email_confirmation(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply `POINTS_DATABASE_URL`, `POINTS_DEFAULT_BALANCE` and
    /// `POINTS_MAX_CONNECTIONS` from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("POINTS_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(raw) = lookup("POINTS_DEFAULT_BALANCE") {
            self.default_normal_balance = parse_value("POINTS_DEFAULT_BALANCE", &raw)?;
            if self.default_normal_balance < Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    key: "POINTS_DEFAULT_BALANCE".to_string(),
                    value: raw,
                });
            }
        }
        if let Some(raw) = lookup("POINTS_MAX_CONNECTIONS") {
            self.max_connections = parse_value("POINTS_MAX_CONNECTIONS", &raw)?;
        }
        Ok(self)
    }

    /// Busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Pool settings for the persistence layer
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            busy_timeout: self.busy_timeout(),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();

        assert_eq!(config.database_url, "sqlite:data/points.db?mode=rwc");
        assert_eq!(config.default_normal_balance, dec!(100));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.require_email_confirmation);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "default_normal_balance": "50", "max_connections": 2 }}"#).unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_normal_balance, dec!(50));
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("POINTS_DATABASE_URL", "sqlite::memory:"),
            ("POINTS_DEFAULT_BALANCE", "250"),
        ]
        .into_iter()
        .collect();

        let config = LedgerConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.default_normal_balance, dec!(250));
        assert_eq!(config.pool_settings().max_connections, 5);
    }

    #[test]
    fn test_bad_override_rejected() {
        let result = LedgerConfig::default().with_overrides(|key| {
            (key == "POINTS_DEFAULT_BALANCE").then(|| "-5".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result = LedgerConfig::default().with_overrides(|key| {
            (key == "POINTS_MAX_CONNECTIONS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
