//! Process configuration for the ingestion daemon.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use wa_bridge::{BridgeConfig, DEFAULT_BASE_URL};

use crate::archiver::ArchiverConfig;
use crate::error::ConfigError;

const DEFAULT_SQLITE_PATH: &str = "./data/archive.db";
const DEFAULT_POOL_SIZE: u32 = 20;
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 60;

/// Configuration for `ingestd`.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// SQLx connection URL.
    pub database_url: String,
    /// Database file, when configured as a plain path.
    pub sqlite_path: Option<PathBuf>,
    pub db_pool_size: u32,
    pub bridge: BridgeConfig,
    pub archive: ArchiverConfig,
}

impl IngestConfig {
    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `ARCHIVE_BUCKET` - Bucket for archived content
    ///
    /// Optional (with defaults):
    /// - `SQLITE_PATH` - Database file or `sqlite:` URL. Default: ./data/archive.db
    /// - `DB_POOL_SIZE` - Default: 20
    /// - `BRIDGE_URL` - Default: http://127.0.0.1:8080
    /// - `BRIDGE_ACCOUNT` - Default: unset (single-account daemon)
    /// - `ARCHIVE_WAIT_FOR_VISIBILITY` - Default: true
    /// - `ARCHIVE_WAIT_TIMEOUT_SECS` - Default: 60
    ///
    /// S3 credentials and region come from the standard AWS environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let sqlite = get("SQLITE_PATH").unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string());
        let (database_url, sqlite_path) = database_url(&sqlite);

        let db_pool_size = match get("DB_POOL_SIZE") {
            Some(value) => parse_number::<u32>("DB_POOL_SIZE", &value)?,
            None => DEFAULT_POOL_SIZE,
        };
        if db_pool_size == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_POOL_SIZE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let base_url = get("BRIDGE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let bridge = match get("BRIDGE_ACCOUNT") {
            Some(account) => BridgeConfig::with_account(base_url, account),
            None => BridgeConfig::new(base_url),
        };

        let bucket = get("ARCHIVE_BUCKET")
            .ok_or_else(|| ConfigError::MissingEnvVar("ARCHIVE_BUCKET".to_string()))?;
        let mut archive = ArchiverConfig::new(bucket);
        if let Some(value) = get("ARCHIVE_WAIT_FOR_VISIBILITY") {
            archive.wait_for_visibility = parse_bool("ARCHIVE_WAIT_FOR_VISIBILITY", &value)?;
        }
        let wait_secs = match get("ARCHIVE_WAIT_TIMEOUT_SECS") {
            Some(value) => parse_number::<u64>("ARCHIVE_WAIT_TIMEOUT_SECS", &value)?,
            None => DEFAULT_WAIT_TIMEOUT_SECS,
        };
        archive.wait_timeout = Duration::from_secs(wait_secs);

        Ok(Self {
            database_url,
            sqlite_path,
            db_pool_size,
            bridge,
            archive,
        })
    }

    /// Directory that must exist before the database file can be created.
    pub fn database_dir(&self) -> Option<&Path> {
        self.sqlite_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

/// Turn a path or URL into a connection URL, keeping the path if there is one.
fn database_url(value: &str) -> (String, Option<PathBuf>) {
    if value.starts_with("sqlite:") {
        (value.to_string(), None)
    } else {
        (format!("sqlite:{}?mode=rwc", value), Some(PathBuf::from(value)))
    }
}

fn parse_number<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var: var.to_string(),
        message: e.to_string(),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var: var.to_string(),
            message: format!("expected a boolean, got {:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<IngestConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngestConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("ARCHIVE_BUCKET", "wa-archive")]).unwrap();
        assert_eq!(config.database_url, "sqlite:./data/archive.db?mode=rwc");
        assert_eq!(config.database_dir(), Some(Path::new("./data")));
        assert_eq!(config.db_pool_size, 20);
        assert_eq!(config.bridge.base_url, "http://127.0.0.1:8080");
        assert!(config.bridge.account.is_none());
        assert_eq!(config.archive.bucket, "wa-archive");
        assert!(config.archive.wait_for_visibility);
        assert_eq!(config.archive.wait_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_bucket_is_required() {
        assert!(matches!(config(&[]), Err(ConfigError::MissingEnvVar(v)) if v == "ARCHIVE_BUCKET"));
        assert!(matches!(
            config(&[("ARCHIVE_BUCKET", "  ")]),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ARCHIVE_BUCKET", "wa-archive"),
            ("SQLITE_PATH", "sqlite::memory:"),
            ("DB_POOL_SIZE", "4"),
            ("BRIDGE_URL", "http://bridge:9000"),
            ("BRIDGE_ACCOUNT", "+15551234567"),
            ("ARCHIVE_WAIT_FOR_VISIBILITY", "no"),
            ("ARCHIVE_WAIT_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert!(config.database_dir().is_none());
        assert_eq!(config.db_pool_size, 4);
        assert_eq!(config.bridge.account.as_deref(), Some("+15551234567"));
        assert!(!config.archive.wait_for_visibility);
        assert_eq!(config.archive.wait_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        for (var, value) in [
            ("DB_POOL_SIZE", "many"),
            ("DB_POOL_SIZE", "0"),
            ("ARCHIVE_WAIT_FOR_VISIBILITY", "maybe"),
            ("ARCHIVE_WAIT_TIMEOUT_SECS", "-1"),
        ] {
            let result = config(&[("ARCHIVE_BUCKET", "b"), (var, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { var: ref v, .. }) if v == var),
                "{}={} should be rejected",
                var,
                value
            );
        }
    }

    #[test]
    fn test_bare_file_name_has_no_dir() {
        let config = config(&[("ARCHIVE_BUCKET", "b"), ("SQLITE_PATH", "archive.db")]).unwrap();
        assert_eq!(config.database_url, "sqlite:archive.db?mode=rwc");
        assert!(config.database_dir().is_none());
    }
}
