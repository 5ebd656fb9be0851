//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `ECOMM_API_URL` - Backend API base URL (default: `http://localhost:8080/api`)
//! - `ECOMM_STATE_DIR` - Directory for persisted session and cart (default: `.ecomm`)
//! - `ECOMM_HTTP_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `ECOMM_PRODUCT_CACHE_TTL_SECS` - Product cache lifetime (default: 300)
//! - `ECOMM_PRODUCT_CACHE_CAPACITY` - Product cache size (default: 1000)
//! - `ECOMM_ALERT_DURATION_MS` - Alert lifetime, 0 for sticky (default: 5000)
//! - `ECOMM_ALERT_DEBOUNCE_MS` - Duplicate alert window (default: 100)
//! - `ECOMM_PAGE_SIZE` - Product listing page size (default: 12)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_STATE_DIR: &str = ".ecomm";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API base URL
    pub api_url: Url,
    /// Directory holding the persisted state document
    pub state_dir: PathBuf,
    pub http_timeout: Duration,
    pub product_cache_ttl: Duration,
    pub product_cache_capacity: u64,
    /// Default alert lifetime; zero keeps alerts until dismissed
    pub alert_duration: TimeDelta,
    pub alert_debounce: TimeDelta,
    /// Products per listing page
    pub page_size: u32,
}

impl StorefrontConfig {
    /// Defaults pointed at `api_url`.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            http_timeout: Duration::from_secs(30),
            product_cache_ttl: Duration::from_secs(300),
            product_cache_capacity: 1000,
            alert_duration: TimeDelta::milliseconds(5000),
            alert_debounce: TimeDelta::milliseconds(100),
            page_size: 12,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let api_url = env.parse_url("ECOMM_API_URL", DEFAULT_API_URL)?;
        let mut config = Self::new(api_url);

        if let Some(dir) = env.optional("ECOMM_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        config.http_timeout = Duration::from_secs(env.parse_or("ECOMM_HTTP_TIMEOUT_SECS", 30)?);
        config.product_cache_ttl =
            Duration::from_secs(env.parse_or("ECOMM_PRODUCT_CACHE_TTL_SECS", 300)?);
        config.product_cache_capacity = env.parse_or("ECOMM_PRODUCT_CACHE_CAPACITY", 1000)?;
        config.alert_duration =
            TimeDelta::milliseconds(env.parse_or("ECOMM_ALERT_DURATION_MS", 5000)?);
        config.alert_debounce =
            TimeDelta::milliseconds(env.parse_or("ECOMM_ALERT_DEBOUNCE_MS", 100)?);
        config.page_size = env.parse_or("ECOMM_PAGE_SIZE", 12)?;

        if config.page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ECOMM_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional, non-blank variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Parse an http(s) URL.
    fn parse_url(&self, key: &str, default: &str) -> Result<Url, ConfigError> {
        let raw = self.optional(key).unwrap_or_else(|| default.to_string());
        let url = Url::parse(raw.trim())
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected an http(s) URL, got {raw}"),
            ));
        }
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8080/api");
        assert_eq!(config.state_dir, PathBuf::from(".ecomm"));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.alert_duration, TimeDelta::milliseconds(5000));
        assert_eq!(config.alert_debounce, TimeDelta::milliseconds(100));
        assert_eq!(config.page_size, 12);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ECOMM_API_URL", "https://shop.example.com/api/"),
            ("ECOMM_STATE_DIR", "/tmp/ecomm"),
            ("ECOMM_ALERT_DURATION_MS", "0"),
            ("ECOMM_PAGE_SIZE", " 24 "),
        ])
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("shop.example.com"));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/ecomm"));
        assert_eq!(config.alert_duration, TimeDelta::zero());
        assert_eq!(config.page_size, 24);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("ECOMM_HTTP_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "ECOMM_HTTP_TIMEOUT_SECS"
        ));
        assert!(load(&[("ECOMM_API_URL", "ftp://example.com")]).is_err());
        assert!(load(&[("ECOMM_API_URL", "not a url")]).is_err());
        assert!(load(&[("ECOMM_PAGE_SIZE", "0")]).is_err());
    }
}
