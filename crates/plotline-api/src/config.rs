use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub rate_limit_window: Duration,
    pub auth_rate_limit_per_window: u32,
    pub sync_rate_limit_per_window: u32,
    pub max_snapshot_bytes: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("jwt_secret", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "auth_rate_limit_per_window",
                &self.auth_rate_limit_per_window,
            )
            .field(
                "sync_rate_limit_per_window",
                &self.sync_rate_limit_per_window,
            )
            .field("max_snapshot_bytes", &self.max_snapshot_bytes)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "PLOTLINE_API_BIND_ADDR", "127.0.0.1:8080");
        let db_path = value_or_default(&lookup, "PLOTLINE_DB_PATH", "plotline.db");

        let jwt_secret = required_trimmed(&lookup, "PLOTLINE_JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Invalid(format!(
                "PLOTLINE_JWT_SECRET must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }

        let session_ttl_secs = parse_in_range(
            &lookup,
            "PLOTLINE_SESSION_TTL_SECS",
            "2592000",
            300..=31_536_000,
        )?;
        let rate_limit_window_secs =
            parse_in_range(&lookup, "RATE_LIMIT_WINDOW_SECS", "60", 10..=3_600)?;
        let auth_rate_limit_per_window =
            parse_in_range(&lookup, "AUTH_RATE_LIMIT_PER_WINDOW", "10", 1..=1_000)?;
        let sync_rate_limit_per_window =
            parse_in_range(&lookup, "SYNC_RATE_LIMIT_PER_WINDOW", "120", 1..=5_000)?;
        let max_snapshot_bytes = parse_in_range(
            &lookup,
            "PLOTLINE_MAX_SNAPSHOT_BYTES",
            "8388608",
            1_024..=268_435_456,
        )?;

        Ok(Self {
            bind_addr,
            db_path,
            jwt_secret,
            session_ttl: Duration::from_secs(session_ttl_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            auth_rate_limit_per_window: u32::try_from(auth_rate_limit_per_window)
                .map_err(|_| ConfigError::Invalid("AUTH_RATE_LIMIT_PER_WINDOW overflow".to_string()))?,
            sync_rate_limit_per_window: u32::try_from(sync_rate_limit_per_window)
                .map_err(|_| ConfigError::Invalid("SYNC_RATE_LIMIT_PER_WINDOW overflow".to_string()))?,
            max_snapshot_bytes: usize::try_from(max_snapshot_bytes)
                .map_err(|_| ConfigError::Invalid("PLOTLINE_MAX_SNAPSHOT_BYTES overflow".to_string()))?,
        })
    }
}

fn parse_in_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "{name} must be an integer in [{}, {}]",
                range.start(),
                range.end()
            ))
        })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef-sensitive";

    fn config_from(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_requires_jwt_secret() {
        let err = config_from(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("PLOTLINE_JWT_SECRET"));
    }

    #[test]
    fn config_rejects_short_jwt_secret() {
        let mut map = HashMap::new();
        map.insert("PLOTLINE_JWT_SECRET", "too-short");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn config_applies_defaults() {
        let mut map = HashMap::new();
        map.insert("PLOTLINE_JWT_SECRET", SECRET);
        let config = config_from(&map).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.db_path, "plotline.db");
        assert_eq!(config.session_ttl, Duration::from_secs(30 * 24 * 3_600));
        assert_eq!(config.auth_rate_limit_per_window, 10);
        assert_eq!(config.sync_rate_limit_per_window, 120);
        assert_eq!(config.max_snapshot_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn config_validates_ranges() {
        let mut map = HashMap::new();
        map.insert("PLOTLINE_JWT_SECRET", SECRET);
        map.insert("RATE_LIMIT_WINDOW_SECS", "5");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("RATE_LIMIT_WINDOW_SECS"));
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let mut map = HashMap::new();
        map.insert("PLOTLINE_JWT_SECRET", SECRET);
        let config = config_from(&map).unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
