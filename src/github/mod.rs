//! API client facade.
//!
//! Handlers receive a `&dyn ApiClient` and nothing else. This module provides
//! the trait and its production implementations:
//!
//! - [`OctocrabClient`]: GitHub REST calls through octocrab
//! - [`HttpClient`]: header-exact calls to other services (GitLab)
//! - [`RateLimitedClient`]: backoff wrapper for either of the above

mod client;
mod error;
mod http_client;
mod octocrab_client;
mod retry;

pub use client::{ApiClient, ApiRequest, ApiResponse, Method};
pub use error::{TransportError, TransportErrorKind};
pub use http_client::HttpClient;
pub use octocrab_client::OctocrabClient;
pub use retry::{BackoffConfig, RateLimitedClient, is_rate_limited, rate_limit_wait};
