use std::time::Duration;

/// Environment variable holding the backend base URL.
pub const API_URL_ENV: &str = "TWIN_API_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Settings for the data-access layer, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Deadline applied to every regular call.
    pub request_timeout: Duration,
    /// Deadline for the connectivity probe.
    pub probe_timeout: Duration,
    /// Period of the connectivity monitor.
    pub monitor_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults, with the base URL taken from `TWIN_API_URL` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) else {
            return Self::default();
        };
        Self::with_base_url(url.trim())
    }
}
