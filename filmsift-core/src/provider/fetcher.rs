//! Rate-limited provider access with a run-wide circuit breaker
//!
//! Two independent failure paths:
//! - **Rate limiting**: the provider answers with its limit sentinel. The
//!   first occurrence is announced once, every retry waits
//!   `rate_limit_wait`, and exhausting `max_retries` opens the breaker for the
//!   rest of the run.
//! - **Network failures**: timeouts, connection errors, 5xx. Retried with
//!   exponential backoff; they never open the breaker.

use super::query::ProviderQuery;
use super::transport::{OmdbTransport, ProviderTransport, TransportResponse};
use crate::error::ProviderError;
use filmsift_common::config::ProviderConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Shared ENABLED/DISABLED state for the provider
///
/// Transitions use compare-and-swap so the "disabled" and "rate limited"
/// messages are logged exactly once no matter how many tasks race.
#[derive(Debug, Default)]
pub struct Breaker {
    disabled: AtomicBool,
    rate_limit_warned: AtomicBool,
}

impl Breaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Breaker that starts open (cache-only run)
    pub fn opened() -> Self {
        Self {
            disabled: AtomicBool::new(true),
            rate_limit_warned: AtomicBool::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Open the breaker; returns true for the call that performed the transition
    pub fn trip(&self, reason: &str) -> bool {
        let opened = self
            .disabled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if opened {
            error!(
                reason,
                "Provider disabled for the rest of this run; using local cache only"
            );
        }
        opened
    }

    /// Announce rate limiting; returns true for the first announcement only
    pub fn warn_rate_limited(&self, wait: Duration) -> bool {
        let first = self
            .rate_limit_warned
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            warn!(
                wait_secs = wait.as_secs_f64(),
                "Provider request limit reached; waiting before retrying"
            );
        }
        first
    }
}

/// Retry and pacing knobs for [`RateLimitedFetcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetcherSettings {
    pub request_timeout: Duration,
    pub rate_limit_wait: Duration,
    pub max_retries: u32,
    pub network_retries: u32,
    pub network_backoff: Duration,
    pub requests_per_second: Option<NonZeroU32>,
    pub rate_limit_sentinel: String,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default())
    }
}

impl FetcherSettings {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            rate_limit_wait: Duration::from_secs(config.rate_limit_wait_secs),
            max_retries: config.max_retries,
            network_retries: config.network_retries,
            network_backoff: Duration::from_millis(config.network_backoff_ms),
            requests_per_second: config.requests_per_second.and_then(NonZeroU32::new),
            rate_limit_sentinel: config.rate_limit_sentinel.clone(),
        }
    }
}

pub struct RateLimitedFetcher {
    transport: Option<Arc<dyn ProviderTransport>>,
    breaker: Arc<Breaker>,
    settings: FetcherSettings,
    pacer: Option<DefaultDirectRateLimiter>,
}

impl RateLimitedFetcher {
    pub fn new(
        transport: Arc<dyn ProviderTransport>,
        breaker: Arc<Breaker>,
        settings: FetcherSettings,
    ) -> Self {
        let pacer = settings
            .requests_per_second
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Self {
            transport: Some(transport),
            breaker,
            settings,
            pacer,
        }
    }

    /// Fetcher with no transport; every call reports `MissingApiKey`
    pub fn unavailable(breaker: Arc<Breaker>, settings: FetcherSettings) -> Self {
        Self {
            transport: None,
            breaker,
            settings,
            pacer: None,
        }
    }

    /// Build the production fetcher from configuration
    pub fn from_config(
        config: &ProviderConfig,
        api_key: Option<&str>,
        breaker: Arc<Breaker>,
    ) -> Self {
        let settings = FetcherSettings::from_config(config);

        let Some(api_key) = api_key else {
            warn!("No provider API key configured; running from local cache only");
            return Self::unavailable(breaker, settings);
        };

        match OmdbTransport::new(&config.base_url, api_key, settings.request_timeout) {
            Ok(transport) => Self::new(Arc::new(transport), breaker, settings),
            Err(e) => {
                error!(error = %e, "Failed to build HTTP client; running from local cache only");
                Self::unavailable(breaker, settings)
            }
        }
    }

    pub fn breaker(&self) -> &Arc<Breaker> {
        &self.breaker
    }

    pub fn settings(&self) -> &FetcherSettings {
        &self.settings
    }

    /// True when a call could reach the network
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some() && !self.breaker.is_open()
    }

    /// Fetch and parse one provider payload
    ///
    /// Short-circuits without I/O while the breaker is open.
    pub async fn fetch(&self, query: &ProviderQuery) -> Result<Value, ProviderError> {
        let Some(transport) = self.transport.as_deref() else {
            return Err(ProviderError::MissingApiKey);
        };

        let attempts_allowed = self.settings.max_retries.saturating_add(1);
        let mut rate_limited = 0u32;

        loop {
            if self.breaker.is_open() {
                return Err(ProviderError::Disabled);
            }

            let payload = self.fetch_with_network_retries(transport, query).await?;

            if !self.is_rate_limited(&payload) {
                return Ok(payload);
            }

            rate_limited += 1;
            self.breaker.warn_rate_limited(self.settings.rate_limit_wait);
            debug!(%query, attempt = rate_limited, "Provider rate limited");

            if rate_limited >= attempts_allowed {
                self.breaker.trip(&format!(
                    "still rate limited after {} retries",
                    self.settings.max_retries
                ));
                return Err(ProviderError::RateLimited);
            }

            tokio::time::sleep(self.settings.rate_limit_wait).await;
        }
    }

    async fn fetch_with_network_retries(
        &self,
        transport: &dyn ProviderTransport,
        query: &ProviderQuery,
    ) -> Result<Value, ProviderError> {
        let params = query.params();
        let mut attempt = 0u32;

        loop {
            if let Some(pacer) = &self.pacer {
                pacer.until_ready().await;
            }

            let request = transport.get(&params);
            let outcome = match tokio::time::timeout(self.settings.request_timeout, request).await {
                Ok(result) => result.and_then(|response| self.interpret(response)),
                Err(_) => Err(ProviderError::TransientNetwork(format!(
                    "request timed out after {:?}",
                    self.settings.request_timeout
                ))),
            };

            match outcome {
                Err(ProviderError::TransientNetwork(reason))
                    if attempt < self.settings.network_retries =>
                {
                    let backoff = self.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        %query,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        reason = %reason,
                        "Provider request failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;

                    if self.breaker.is_open() {
                        return Err(ProviderError::Disabled);
                    }
                }
                Err(ProviderError::TransientNetwork(reason)) => {
                    warn!(%query, attempts = attempt + 1, reason = %reason, "Provider unreachable");
                    return Err(ProviderError::TransientNetwork(reason));
                }
                other => return other,
            }
        }
    }

    /// Parse the body; the sentinel check happens on any status
    fn interpret(&self, response: TransportResponse) -> Result<Value, ProviderError> {
        let parsed = serde_json::from_str::<Value>(&response.body)
            .ok()
            .filter(Value::is_object);

        match parsed {
            Some(payload) if self.is_rate_limited(&payload) => Ok(payload),
            _ if response.status >= 500 || response.status == 429 => Err(
                ProviderError::TransientNetwork(format!("HTTP {}", response.status)),
            ),
            Some(payload) => Ok(payload),
            None => Err(ProviderError::MalformedPayload(format!(
                "HTTP {} with non-object body",
                response.status
            ))),
        }
    }

    fn is_rate_limited(&self, payload: &Value) -> bool {
        payload.get("Error").and_then(Value::as_str)
            == Some(self.settings.rate_limit_sentinel.as_str())
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.settings
            .network_backoff
            .saturating_mul(factor)
            .min(MAX_BACKOFF)
    }
}
