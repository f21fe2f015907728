//! Runtime settings read from the environment.
//!
//! # Responsibility
//! - Resolve database, logging, HTTP and API-key settings with defaults.
//!
//! # Invariants
//! - Blank variables count as unset.
//! - Invalid values fail loudly instead of falling back to defaults.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "NOTEBASE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "NOTEBASE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTEBASE_LOG_DIR";
pub const ENV_BIND: &str = "NOTEBASE_BIND";
pub const ENV_CORS_ORIGINS: &str = "NOTEBASE_CORS_ORIGINS";
pub const ENV_NOTION_API_KEY: &str = "NOTION_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_AI_MODEL: &str = "NOTEBASE_AI_MODEL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "NOTEBASE_HTTP_TIMEOUT_SECS";

const APP_DIR_NAME: &str = "notebase";
const DB_FILE_NAME: &str = "notebase.sqlite3";
const DEFAULT_BIND: &str = "127.0.0.1:8000";
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors from settings resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No platform data directory and no explicit path was given.
    NoDataDir(&'static str),
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDataDir(key) => write!(
                f,
                "cannot determine a data directory; set `{key}` explicitly"
            ),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    pub log_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub notion_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ai_model: Option<String>,
    pub http_timeout: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = match get(ENV_DB_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_data_dir(ENV_DB_PATH)?.join(DB_FILE_NAME),
        };
        let log_dir = match get(ENV_LOG_DIR) {
            Some(path) => absolute_path(ENV_LOG_DIR, path)?,
            None => default_data_dir(ENV_LOG_DIR)?.join("logs"),
        };
        let log_level = match get(ENV_LOG_LEVEL) {
            Some(level) => normalize_level(&level).map_err(|err| ConfigError::InvalidValue {
                key: ENV_LOG_LEVEL,
                value: level.clone(),
                reason: err.to_string(),
            })?,
            None => default_log_level(),
        };

        let bind_text = get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_text
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::InvalidValue {
                key: ENV_BIND,
                value: bind_text.clone(),
                reason: err.to_string(),
            })?;

        let cors_origins = match get(ENV_CORS_ORIGINS) {
            Some(list) => parse_origin_list(&list),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let http_timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(text) => parse_timeout(&text)?,
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            bind_addr,
            cors_origins,
            notion_api_key: get(ENV_NOTION_API_KEY),
            anthropic_api_key: get(ENV_ANTHROPIC_API_KEY),
            ai_model: get(ENV_AI_MODEL),
            http_timeout,
        })
    }
}

fn default_data_dir(key: &'static str) -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoDataDir(key))
}

fn absolute_path(key: &'static str, value: String) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(&value);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "must be an absolute path".to_string(),
        })
    }
}

fn parse_origin_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_timeout(text: &str) -> Result<Duration, ConfigError> {
    match text.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key: ENV_HTTP_TIMEOUT_SECS,
            value: text.to_string(),
            reason: "expected a positive number of seconds".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn explicit_values_override_defaults() {
        let settings = settings_from(&[
            (ENV_DB_PATH, "/tmp/kb/test.sqlite3"),
            (ENV_LOG_DIR, "/tmp/kb/logs"),
            (ENV_LOG_LEVEL, "WARN"),
            (ENV_BIND, "0.0.0.0:9000"),
            (ENV_CORS_ORIGINS, "https://a.example, ,https://b.example"),
            (ENV_NOTION_API_KEY, "secret_notion"),
            (ENV_HTTP_TIMEOUT_SECS, "5"),
        ])
        .unwrap();

        assert_eq!(settings.db_path, PathBuf::from("/tmp/kb/test.sqlite3"));
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(
            settings.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(settings.notion_api_key.as_deref(), Some("secret_notion"));
        assert_eq!(settings.anthropic_api_key, None);
        assert_eq!(settings.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = settings_from(&[
            (ENV_DB_PATH, "/tmp/kb/test.sqlite3"),
            (ENV_LOG_DIR, "/tmp/kb/logs"),
            (ENV_ANTHROPIC_API_KEY, "   "),
            (ENV_BIND, ""),
        ])
        .unwrap();
        assert_eq!(settings.anthropic_api_key, None);
        assert_eq!(settings.bind_addr.to_string(), DEFAULT_BIND);
        assert_eq!(settings.cors_origins.len(), DEFAULT_CORS_ORIGINS.len());
        assert_eq!(
            settings.http_timeout,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
        );
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        let base = [(ENV_DB_PATH, "/tmp/kb.sqlite3"), (ENV_LOG_DIR, "/tmp/kb-logs")];

        let mut pairs = base.to_vec();
        pairs.push((ENV_BIND, "not-an-address"));
        assert!(matches!(
            settings_from(&pairs),
            Err(ConfigError::InvalidValue { key: ENV_BIND, .. })
        ));

        let mut pairs = base.to_vec();
        pairs.push((ENV_HTTP_TIMEOUT_SECS, "0"));
        assert!(matches!(
            settings_from(&pairs),
            Err(ConfigError::InvalidValue {
                key: ENV_HTTP_TIMEOUT_SECS,
                ..
            })
        ));

        let mut pairs = base.to_vec();
        pairs.push((ENV_LOG_LEVEL, "chatty"));
        assert!(matches!(
            settings_from(&pairs),
            Err(ConfigError::InvalidValue { key: ENV_LOG_LEVEL, .. })
        ));

        assert!(matches!(
            settings_from(&[(ENV_DB_PATH, "/tmp/kb.sqlite3"), (ENV_LOG_DIR, "rel/logs")]),
            Err(ConfigError::InvalidValue { key: ENV_LOG_DIR, .. })
        ));
    }
}
