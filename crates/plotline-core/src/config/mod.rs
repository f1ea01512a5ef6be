//! Client-side runtime configuration.
//!
//! `SyncSettings` controls coordinator timing; `ClientConfig` points a client
//! at a Plotline API deployment.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);
pub const DEFAULT_GUARD_WINDOW: Duration = Duration::from_secs(3);
pub const DEFAULT_PERIODIC_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_BEACON_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";

/// Timing knobs for the sync coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Quiet period after the last mutation before a push fires.
    pub debounce: Duration,
    /// Pushes are suppressed for this long after a pull.
    pub guard_window: Duration,
    /// Period of the background push/retry tick.
    pub periodic_interval: Duration,
    /// Upper bound on the fire-and-forget exit push.
    pub beacon_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            guard_window: DEFAULT_GUARD_WINDOW,
            periodic_interval: DEFAULT_PERIODIC_INTERVAL,
            beacon_timeout: DEFAULT_BEACON_TIMEOUT,
        }
    }
}

impl SyncSettings {
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let debounce_ms = parse_in_range(&lookup, "PLOTLINE_SYNC_DEBOUNCE_MS", 2_000, 100..=60_000)?;
        let guard_ms = parse_in_range(&lookup, "PLOTLINE_SYNC_GUARD_MS", 3_000, 0..=60_000)?;
        let interval_secs = parse_in_range(&lookup, "PLOTLINE_SYNC_INTERVAL_SECS", 15, 1..=3_600)?;
        let beacon_ms = parse_in_range(&lookup, "PLOTLINE_BEACON_TIMEOUT_MS", 2_000, 100..=30_000)?;

        Ok(Self {
            debounce: Duration::from_millis(debounce_ms),
            guard_window: Duration::from_millis(guard_ms),
            periodic_interval: Duration::from_secs(interval_secs),
            beacon_timeout: Duration::from_millis(beacon_ms),
        })
    }
}

/// Where a client finds the Plotline API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url.into())?,
        })
    }

    /// Build from `PLOTLINE_API_URL`, falling back to the local default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        match normalize_text_option(lookup("PLOTLINE_API_URL")) {
            Some(url) => Self::new(url),
            None => Ok(Self::default()),
        }
    }

    /// Join a path such as `/sync` onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

/// Trim, require an http(s) scheme and drop trailing slashes.
pub fn normalize_base_url(raw: String) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("API base URL must not be empty".to_string()))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

fn parse_in_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64> {
    let Some(raw) = normalize_text_option(lookup(name)) else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        Error::Config(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    })?;
    if !range.contains(&value) {
        return Err(Error::Config(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| map.get(key).map(|value| (*value).to_string())
    }

    #[test]
    fn settings_default_when_unset() {
        let map = HashMap::new();
        let settings = SyncSettings::from_lookup(lookup_from(&map)).unwrap();
        assert_eq!(settings, SyncSettings::default());
        assert_eq!(settings.debounce, Duration::from_secs(2));
        assert_eq!(settings.guard_window, Duration::from_secs(3));
        assert_eq!(settings.periodic_interval, Duration::from_secs(15));
    }

    #[test]
    fn settings_read_overrides() {
        let mut map = HashMap::new();
        map.insert("PLOTLINE_SYNC_DEBOUNCE_MS", "500");
        map.insert("PLOTLINE_SYNC_GUARD_MS", " 0 ");
        map.insert("PLOTLINE_SYNC_INTERVAL_SECS", "60");
        let settings = SyncSettings::from_lookup(lookup_from(&map)).unwrap();
        assert_eq!(settings.debounce, Duration::from_millis(500));
        assert_eq!(settings.guard_window, Duration::ZERO);
        assert_eq!(settings.periodic_interval, Duration::from_secs(60));
        assert_eq!(settings.beacon_timeout, DEFAULT_BEACON_TIMEOUT);
    }

    #[test]
    fn settings_reject_out_of_range_values() {
        let mut map = HashMap::new();
        map.insert("PLOTLINE_SYNC_INTERVAL_SECS", "0");
        let error = SyncSettings::from_lookup(lookup_from(&map)).unwrap_err();
        assert!(error.to_string().contains("PLOTLINE_SYNC_INTERVAL_SECS"));

        let mut map = HashMap::new();
        map.insert("PLOTLINE_SYNC_DEBOUNCE_MS", "soon");
        assert!(SyncSettings::from_lookup(lookup_from(&map)).is_err());
    }

    #[test]
    fn client_config_normalizes_base_url() {
        let config = ClientConfig::new(" https://api.plotline.app/ ").unwrap();
        assert_eq!(config.api_base_url, "https://api.plotline.app");
        assert_eq!(config.endpoint("/sync"), "https://api.plotline.app/sync");
        assert_eq!(
            config.endpoint("auth/login"),
            "https://api.plotline.app/auth/login"
        );
    }

    #[test]
    fn client_config_rejects_invalid_urls() {
        assert!(ClientConfig::new("").is_err());
        assert!(ClientConfig::new("api.plotline.app").is_err());
    }

    #[test]
    fn client_config_falls_back_to_default() {
        let map = HashMap::new();
        assert_eq!(
            ClientConfig::from_lookup(lookup_from(&map)).unwrap(),
            ClientConfig::default()
        );
    }
}
