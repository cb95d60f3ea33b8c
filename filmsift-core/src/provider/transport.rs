//! HTTP transport to the rating provider

use crate::error::ProviderError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Raw provider response; interpretation is left to the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Single GET against the provider endpoint
///
/// Implementations report connection-level failures as
/// `ProviderError::TransientNetwork` and return every HTTP response,
/// whatever its status.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn get(
        &self,
        params: &[(&'static str, String)],
    ) -> Result<TransportResponse, ProviderError>;
}

/// OMDb-style endpoint over `reqwest`
pub struct OmdbTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OmdbTransport {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("filmsift/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ProviderTransport for OmdbTransport {
    async fn get(
        &self,
        params: &[(&'static str, String)],
    ) -> Result<TransportResponse, ProviderError> {
        debug!(url = %self.base_url, ?params, "Provider request");

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::TransientNetwork(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::TransientNetwork(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
