//! Process configuration.
//!
//! # Responsibility
//! - Collect database, uploads, public URL and logging settings.
//! - Apply `PORTFOLIO_*` environment overrides on top of defaults.
//!
//! # Invariants
//! - Blank override values fall back to defaults.
//! - `public_url_prefix` never ends with `/`.

use crate::assets::UploadStore;
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "PORTFOLIO_DB_PATH";
pub const ENV_UPLOADS_DIR: &str = "PORTFOLIO_UPLOADS_DIR";
pub const ENV_PUBLIC_URL: &str = "PORTFOLIO_PUBLIC_URL";
pub const ENV_LOG_LEVEL: &str = "PORTFOLIO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PORTFOLIO_LOG_DIR";

const DEFAULT_DB_PATH: &str = "portfolio.db";
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub uploads_root: PathBuf,
    pub public_url_prefix: String,
    pub log_level: &'static str,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            uploads_root: PathBuf::from(DEFAULT_UPLOADS_DIR),
            public_url_prefix: DEFAULT_PUBLIC_URL.to_string(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, so tests never touch the real
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = value(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = value(ENV_UPLOADS_DIR) {
            config.uploads_root = PathBuf::from(path);
        }
        if let Some(prefix) = value(ENV_PUBLIC_URL) {
            config.public_url_prefix = prefix.trim_end_matches('/').to_string();
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.log_level =
                normalize_level(&level).map_err(|reason| ConfigError::InvalidValue {
                    key: ENV_LOG_LEVEL,
                    value: level.clone(),
                    reason,
                })?;
        }
        if let Some(dir) = value(ENV_LOG_DIR) {
            if !Path::new(&dir).is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: ENV_LOG_DIR,
                    value: dir,
                    reason: "must be an absolute path".to_string(),
                });
            }
            config.log_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    pub fn upload_store(&self) -> UploadStore {
        UploadStore::new(&self.uploads_root, self.public_url_prefix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_LOG_DIR, ENV_LOG_LEVEL, ENV_PUBLIC_URL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.public_url_prefix, "http://localhost:8080");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn overrides_are_trimmed_and_prefix_loses_trailing_slash() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORTFOLIO_DB_PATH", " /data/site.db "),
            (ENV_PUBLIC_URL, "https://example.org/"),
            (ENV_LOG_LEVEL, "WARNING"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/site.db"));
        assert_eq!(config.public_url_prefix, "https://example.org");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.upload_store().public_prefix(), "https://example.org");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("PORTFOLIO_UPLOADS_DIR", "   ")])).unwrap();
        assert_eq!(config.uploads_root, PathBuf::from("uploads"));
    }

    #[test]
    fn invalid_level_and_relative_log_dir_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_LOG_LEVEL));

        let err = AppConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_LOG_DIR));
    }
}
