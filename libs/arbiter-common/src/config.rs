// Engine configuration
// Passed explicitly into the remote client and orchestrator

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:2358";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Remote execution backend endpoint
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub health_probe_timeout_ms: u64,
    pub poll_attempts: u32,
    pub poll_delay_ms: u64,
    /// Cap on concurrently running dispatch/poll tasks
    pub max_concurrent_dispatch: usize,
    /// Send and receive Judge0 payloads base64 encoded
    pub base64_encoded: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            health_probe_timeout_ms: 5_000,
            poll_attempts: 5,
            poll_delay_ms: 2_000,
            max_concurrent_dispatch: 8,
            base64_encoded: false,
        }
    }
}

impl EngineConfig {
    /// Read configuration from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ARBITER_BACKEND_URL").or_else(|| lookup("JUDGE0_API_URL")) {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.is_empty() {
                return Err(ConfigError::Invalid {
                    key: "ARBITER_BACKEND_URL",
                    value: url,
                    reason: "must not be empty".to_string(),
                });
            }
            config.base_url = url;
        }

        if let Some(v) = parse(&lookup, "ARBITER_REQUEST_TIMEOUT_MS")? {
            config.request_timeout_ms = v;
        }
        if let Some(v) = parse(&lookup, "ARBITER_HEALTH_TIMEOUT_MS")? {
            config.health_probe_timeout_ms = v;
        }
        if let Some(v) = parse(&lookup, "ARBITER_POLL_ATTEMPTS")? {
            config.poll_attempts = v;
        }
        if let Some(v) = parse(&lookup, "ARBITER_POLL_DELAY_MS")? {
            config.poll_delay_ms = v;
        }
        if let Some(v) = parse(&lookup, "ARBITER_MAX_CONCURRENCY")? {
            config.max_concurrent_dispatch = v;
        }
        if let Some(v) = parse(&lookup, "ARBITER_BASE64")? {
            config.base64_encoded = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "ARBITER_POLL_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.max_concurrent_dispatch == 0 {
            return Err(ConfigError::Invalid {
                key: "ARBITER_MAX_CONCURRENCY",
                value: "0".to_string(),
                reason: "at least one concurrent task is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.health_probe_timeout_ms)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
