//! Sync engine configuration.
//!
//! Timing knobs default to the behaviour of the original client: an 8 second
//! push debounce, a 45 second pull poll, and a single 2 second retry.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default remote blob store base URL.
const DEFAULT_SERVER_URL: &str = "https://api.jsonbin.io/v3";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote blob store base URL.
    pub server_url: String,
    /// API key sent with every remote call. Sync stays dormant without one.
    pub api_key: Option<String>,
    /// Directory holding the durable document and bin-id map.
    pub data_dir: PathBuf,
    /// Quiet window after a mutation before a push fires. Later mutations
    /// inside the window restart it, coalescing bursts into one push.
    pub debounce: Duration,
    /// Interval between pull polls.
    pub poll_interval: Duration,
    /// Delay before the single automatic push retry.
    pub retry_delay: Duration,
    /// Upper bound on any single remote call.
    pub request_timeout: Duration,
    /// How long the transient `Synced` status is displayed.
    pub synced_window: Duration,
    /// How long the transient `Error` status is displayed.
    pub error_window: Duration,
}

impl SyncConfig {
    /// Create a builder pre-populated with defaults.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Build a configuration from `HOMEBOUND_*` environment variables,
    /// falling back to the platform data directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var("HOMEBOUND_SERVER_URL") {
            builder = builder.server_url(url);
        }
        if let Ok(key) = std::env::var("HOMEBOUND_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Ok(dir) = std::env::var("HOMEBOUND_DATA_DIR") {
            builder = builder.data_dir(PathBuf::from(dir));
        }
        builder.build()
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    server_url: Option<String>,
    api_key: Option<String>,
    data_dir: Option<PathBuf>,
    debounce: Option<Duration>,
    poll_interval: Option<Duration>,
    retry_delay: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl SyncConfigBuilder {
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let server_url = self.server_url.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(server_url));
        }
        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => dirs::data_dir().ok_or(ConfigError::NoDataDir)?.join("homebound"),
        };
        Ok(SyncConfig {
            server_url: server_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
            data_dir,
            debounce: self.debounce.unwrap_or(Duration::from_secs(8)),
            poll_interval: self.poll_interval.unwrap_or(Duration::from_secs(45)),
            retry_delay: self.retry_delay.unwrap_or(Duration::from_secs(2)),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(15)),
            synced_window: Duration::from_secs(3),
            error_window: Duration::from_secs(5),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::builder()
            .data_dir(PathBuf::from("/tmp/hb-test"))
            .build()
            .unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.debounce, Duration::from_secs(8));
        assert_eq!(config.poll_interval, Duration::from_secs(45));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_rejects_bad_url() {
        let result = SyncConfig::builder()
            .server_url("not-a-url")
            .data_dir(PathBuf::from("/tmp/hb-test"))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = SyncConfig::builder()
            .server_url("https://example.com/")
            .data_dir(PathBuf::from("/tmp/hb-test"))
            .build()
            .unwrap();
        assert_eq!(config.server_url, "https://example.com");
    }
}
