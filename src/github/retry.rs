//! Rate-limit aware backoff for API clients.
//!
//! [`RateLimitedClient`] wraps any [`ApiClient`] and retries a call when:
//!
//! - the server answered 429, or 403 with `x-ratelimit-remaining: 0`
//! - the call failed with a transient [`TransportError`]
//!
//! The wait comes from `retry-after` (seconds) when present, then from
//! `x-ratelimit-reset` (epoch seconds), and otherwise from the exponential
//! schedule in [`BackoffConfig`]. Every wait is capped at `max_delay` and is
//! performed through the inner client's [`ApiClient::sleep`], so tests can
//! observe it without sleeping.
//!
//! Other non-2xx responses are returned unchanged; deciding what a 404 or 422
//! means is the handler's job.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::client::{ApiClient, ApiRequest, ApiResponse};
use super::error::TransportError;

/// Configuration for exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,

    /// Delay before the first retry when the server gives no hint.
    pub initial_delay: Duration,

    /// Cap for any single wait, including server-provided ones.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
}

impl BackoffConfig {
    /// Default configuration: 3 retries with 2s, 4s, 8s fallback delays, and
    /// server-provided waits capped at one minute.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(60),
        backoff_multiplier: 2.0,
    };

    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the fallback delay for the given retry attempt (0-indexed).
    ///
    /// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// Returns an iterator over all fallback delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Returns true if the response signals that the caller is being rate limited.
pub fn is_rate_limited(response: &ApiResponse) -> bool {
    match response.status {
        429 => true,
        403 => response.header("x-ratelimit-remaining") == Some("0"),
        _ => false,
    }
}

/// Computes how long to wait before retrying a rate-limited response.
///
/// `now_epoch_secs` is the current Unix time, passed in so the computation is
/// deterministic under test.
pub fn rate_limit_wait(
    response: &ApiResponse,
    now_epoch_secs: i64,
    attempt: u32,
    config: &BackoffConfig,
) -> Duration {
    let hinted = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .or_else(|| {
            response
                .header("x-ratelimit-reset")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(|reset| Duration::from_secs((reset - now_epoch_secs).max(0) as u64))
        });

    hinted
        .unwrap_or_else(|| config.delay_for_attempt(attempt))
        .min(config.max_delay)
}

/// An [`ApiClient`] that backs off on rate limits and transient failures.
#[derive(Debug, Clone)]
pub struct RateLimitedClient<C> {
    inner: C,
    config: BackoffConfig,
}

impl<C> RateLimitedClient<C> {
    pub fn new(inner: C, config: BackoffConfig) -> Self {
        Self { inner, config }
    }

    /// Returns a reference to the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for RateLimitedClient<C> {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut attempt = 0;

        loop {
            let delay = match self.inner.request(request.clone()).await {
                Ok(response) if is_rate_limited(&response) => {
                    if attempt >= self.config.max_retries {
                        warn!(
                            method = %request.method,
                            url = %request.url,
                            attempts = attempt + 1,
                            "Rate limited; giving up"
                        );
                        return Ok(response);
                    }
                    let now = chrono::Utc::now().timestamp();
                    rate_limit_wait(&response, now, attempt, &self.config)
                }
                Ok(response) => return Ok(response),
                Err(e) if e.kind.is_retriable() && attempt < self.config.max_retries => {
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        error = %e,
                        "Transient transport error; retrying"
                    );
                    self.config.delay_for_attempt(attempt)
                }
                Err(e) => return Err(e),
            };

            debug!(
                method = %request.method,
                url = %request.url,
                delay_ms = delay.as_millis() as u64,
                attempt = attempt + 1,
                "Backing off before retry"
            );
            self.inner.sleep(delay).await;
            attempt += 1;
        }
    }

    async fn sleep(&self, duration: Duration) {
        self.inner.sleep(duration).await
    }
}
