//! HTTP registry client
//!
//! Issues `GET <base_url>?<key_param>=<key>` with a bearer token and returns
//! the raw status and body. Pacing and retries live in the dispatcher and
//! verifier, not here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::RegistryReply;
use super::RegistryLookup;
use crate::credential::Credential;
use crate::error::{ConfigError, TransportError};

const DEFAULT_REGISTRY_URL: &str = "https://api.decolecta.com/v1/reniec/dni";
const DEFAULT_KEY_PARAM: &str = "numero";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`HttpRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    /// Query parameter carrying the lookup key
    pub key_param: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            key_param: DEFAULT_KEY_PARAM.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("batch-verify/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Registry reached over HTTP
pub struct HttpRegistry {
    client: Client,
    config: RegistryConfig,
}

impl HttpRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

#[async_trait]
impl RegistryLookup for HttpRegistry {
    async fn lookup(
        &self,
        key: &str,
        credential: &Credential,
    ) -> Result<RegistryReply, TransportError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[(self.config.key_param.as_str(), key)])
            .bearer_auth(credential.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(key, status, bytes = body.len(), "Registry responded");

        Ok(RegistryReply::new(status, body))
    }
}
