//! Runtime configuration
//!
//! Values come from environment variables (a `.env` file is honoured by the
//! binaries via `dotenvy`), falling back to the defaults below.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `REGISTRY_URL` | `https://api.decolecta.com/v1/reniec/dni` |
//! | `REGISTRY_KEY_PARAM` | `numero` |
//! | `MAX_WORKERS` | 3 |
//! | `REQUEST_DELAY_MS` | 200 |
//! | `MAX_RETRIES` | 3 |
//! | `BACKOFF_UNIT_MS` | 1000 |
//! | `REQUEST_TIMEOUT_SECS` | 30 |
//! | `REGISTRY_USER_AGENT` | `batch-verify/<version>` |
//! | `TOKEN_FILE` | `token.txt` |
//! | `PORT` | 8080 |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatcher::DispatchConfig;
use crate::error::ConfigError;
use crate::registry::RegistryConfig;
use crate::verifier::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub registry_url: String,
    pub key_param: String,
    pub max_workers: usize,
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub backoff_unit_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub token_file: PathBuf,
    pub port: u16,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        let registry = RegistryConfig::default();
        let dispatch = DispatchConfig::default();
        let retry = RetryPolicy::default();
        Self {
            registry_url: registry.base_url,
            key_param: registry.key_param,
            max_workers: dispatch.max_workers,
            request_delay_ms: dispatch.launch_delay.as_millis() as u64,
            max_retries: retry.max_retries,
            backoff_unit_ms: retry.backoff_unit.as_millis() as u64,
            request_timeout_secs: registry.timeout.as_secs(),
            user_agent: registry.user_agent,
            token_file: PathBuf::from("token.txt"),
            port: 8080,
        }
    }
}

impl VerifyConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            registry_url: lookup("REGISTRY_URL").unwrap_or(defaults.registry_url),
            key_param: lookup("REGISTRY_KEY_PARAM").unwrap_or(defaults.key_param),
            max_workers: parse_var(&lookup, "MAX_WORKERS", defaults.max_workers)?,
            request_delay_ms: parse_var(&lookup, "REQUEST_DELAY_MS", defaults.request_delay_ms)?,
            max_retries: parse_var(&lookup, "MAX_RETRIES", defaults.max_retries)?,
            backoff_unit_ms: parse_var(&lookup, "BACKOFF_UNIT_MS", defaults.backoff_unit_ms)?,
            request_timeout_secs: parse_var(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            user_agent: lookup("REGISTRY_USER_AGENT").unwrap_or(defaults.user_agent),
            token_file: lookup("TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_file),
            port: parse_var(&lookup, "PORT", defaults.port)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.registry_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "REGISTRY_URL".to_string(),
                value: self.registry_url.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            base_url: self.registry_url.clone(),
            key_param: self.key_param.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            max_workers: self.max_workers,
            launch_delay: Duration::from_millis(self.request_delay_ms),
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
