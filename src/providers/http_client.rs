//! Rate-Limited HTTP Client for synthesis backends
//!
//! Wraps reqwest with a governor quota so bursts of concurrent variations
//! never exceed a provider's per-minute request budget.

use governor::{Quota, RateLimiter, state::NotKeyed, clock::DefaultClock, middleware::NoOpMiddleware};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder, Response};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::traits::ProviderError;

type DirectLimiter =
    RateLimiter<NotKeyed, governor::state::InMemoryState, DefaultClock, NoOpMiddleware>;

/// Rate-limited HTTP client for API requests
#[derive(Clone)]
pub struct RateLimitedClient {
    client: Client,

    /// Shared across clones so every caller draws from one quota
    limiter: Arc<DirectLimiter>,

    rate_limit_per_minute: u32,
}

impl RateLimitedClient {
    /// Create a new rate-limited client
    ///
    /// # Arguments
    /// * `rate_limit_per_minute` - Maximum requests allowed per minute
    /// * `timeout` - Per-request timeout
    pub fn new(rate_limit_per_minute: u32, timeout: Duration) -> Result<Self, ProviderError> {
        let rate = NonZeroU32::new(rate_limit_per_minute).unwrap_or(nonzero!(1u32));
        let limiter = RateLimiter::direct(Quota::per_minute(rate));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("furniture-studio/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(RateLimitedClient {
            client,
            limiter: Arc::new(limiter),
            rate_limit_per_minute: rate.get(),
        })
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    pub fn get(&self, url: &str) -> RateLimitedRequestBuilder {
        RateLimitedRequestBuilder {
            client: self,
            builder: self.client.get(url),
        }
    }

    pub fn post(&self, url: &str) -> RateLimitedRequestBuilder {
        RateLimitedRequestBuilder {
            client: self,
            builder: self.client.post(url),
        }
    }

    /// Wait for rate limit and execute request
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        self.limiter.until_ready().await;

        debug!("Executing rate-limited request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Http(e)
            }
        })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            warn!(retry_after_secs = retry_after, "Rate limited by provider");

            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        Ok(response)
    }
}

/// Turn a non-success response into an `ApiError`, keeping the body for diagnostics
pub async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError {
        status: status.as_u16(),
        message: extract_error_message(&body),
    })
}

/// Pull `error.message` out of an OpenAI-style error body, else truncate the raw body
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Request builder wrapper that enforces rate limiting
pub struct RateLimitedRequestBuilder<'a> {
    client: &'a RateLimitedClient,
    builder: RequestBuilder,
}

impl<'a> RateLimitedRequestBuilder<'a> {
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> Self {
        self.builder = self.builder.json(json);
        self
    }

    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.builder = self.builder.multipart(form);
        self
    }

    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.builder = self.builder.bearer_auth(token);
        self
    }

    /// Send the request (waits for rate limit)
    pub async fn send(self) -> Result<Response, ProviderError> {
        self.client.execute(self.builder).await
    }
}

/// Validate a configured API base URL and strip any trailing slash
pub fn normalize_base_url(raw: &str) -> Result<String, ProviderError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ProviderError::NotConfigured(format!("invalid base URL '{}': {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProviderError::NotConfigured(format!(
            "base URL must be http or https, got '{}'",
            parsed.scheme()
        )));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
