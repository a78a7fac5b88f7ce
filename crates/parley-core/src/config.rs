//! Configuration management for parley.
//!
//! Loads configuration from a TOML file with sensible defaults. The API base
//! URL resolves with precedence: env > config > default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default backend origin when nothing else is configured (the reference
/// backend's dev address).
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the API base URL.
pub const API_BASE_ENV: &str = "PARLEY_API_BASE";

/// Default per-frame idle deadline for an open push channel, in seconds.
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 120;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend origin for request/response calls, e.g. `http://host:port`.
    pub api_base: String,
    /// Seconds to wait for the next push-channel frame before treating the
    /// turn as faulted. A channel that never reaches `meta`/`done` would
    /// otherwise stay open forever.
    pub stream_idle_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            stream_idle_timeout_secs: DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        validate_url(&config.api_base)?;
        Ok(config)
    }

    /// Resolves the effective API base with precedence: env > config.
    ///
    /// # Errors
    /// Returns an error if the winning value is not a well-formed URL.
    pub fn resolved_api_base(&self) -> Result<String> {
        resolve_api_base(std::env::var(API_BASE_ENV).ok(), &self.api_base)
    }

    /// Idle deadline as a [`Duration`].
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

/// Resolves the API base from an optional env override and the config value.
fn resolve_api_base(env_value: Option<String>, config_value: &str) -> Result<String> {
    if let Some(env_url) = env_value {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trim_trailing_slash(trimmed));
        }
    }
    let trimmed = config_value.trim();
    validate_url(trimmed)?;
    Ok(trim_trailing_slash(trimmed))
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.stream_idle_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(r#"api_base = "https://assist.example.com""#).unwrap();
        assert_eq!(config.api_base, "https://assist.example.com");
        // Unspecified fields keep defaults
        assert_eq!(config.stream_idle_timeout_secs, 120);
    }

    #[test]
    fn test_env_wins_over_config() {
        let resolved = resolve_api_base(
            Some("http://override:9000".to_string()),
            "http://config:8000",
        )
        .unwrap();
        assert_eq!(resolved, "http://override:9000");
    }

    #[test]
    fn test_blank_env_falls_back_to_config() {
        let resolved = resolve_api_base(Some("  ".to_string()), "http://config:8000/").unwrap();
        assert_eq!(resolved, "http://config:8000");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(resolve_api_base(None, "not a url").is_err());
    }
}
