//! Client configuration
//!
//! `RAASTA_API_URL` overrides the `[client]` table of the TOML config, which overrides
//! the compiled defaults.

use raasta_common::config::TomlConfig;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Settings for talking to the report service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, without a trailing slash
    pub base_url: String,
    /// Attempts per submission, including the first
    pub max_attempts: u32,
    /// Per-attempt timeout covering the whole upload
    pub request_timeout: Duration,
    /// Wait before retry `n` is `backoff_base * n`
    pub backoff_base: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            ..Self::default()
        }
    }

    /// Resolve from a TOML config and the environment
    pub fn resolve(toml: &TomlConfig) -> Self {
        let client = &toml.client;
        let base_url = std::env::var("RAASTA_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| client.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self {
            base_url: normalize_base_url(base_url),
            max_attempts: client.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            request_timeout: client
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            backoff_base: client
                .backoff_base_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_BACKOFF_BASE),
        }
    }

    /// Absolute URL for a path below the API root
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use raasta_common::config::ClientToml;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        std::env::remove_var("RAASTA_API_URL");
        let config = ClientConfig::resolve(&TomlConfig::default());
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.url("/reports"), "http://localhost:5001/api/reports");
    }

    #[test]
    #[serial]
    fn test_env_overrides_toml() {
        let toml = TomlConfig {
            client: ClientToml {
                api_url: Some("http://toml.example/api".into()),
                max_attempts: Some(0),
                backoff_base_ms: Some(250),
                ..Default::default()
            },
            ..Default::default()
        };

        std::env::remove_var("RAASTA_API_URL");
        let from_toml = ClientConfig::resolve(&toml);
        assert_eq!(from_toml.base_url, "http://toml.example/api");
        assert_eq!(from_toml.max_attempts, 1);
        assert_eq!(from_toml.backoff_base, Duration::from_millis(250));

        std::env::set_var("RAASTA_API_URL", "http://env.example/api/");
        let from_env = ClientConfig::resolve(&toml);
        std::env::remove_var("RAASTA_API_URL");
        assert_eq!(from_env.base_url, "http://env.example/api");
    }
}
