//! Octocrab-backed [`ApiClient`] for the GitHub REST API.
//!
//! Uses octocrab's raw verbs so that every response, successful or not, comes
//! back to the handler with its status and headers intact. Authentication,
//! `Accept`, and `User-Agent` headers are supplied by the octocrab instance;
//! per-request headers on an [`ApiRequest`] are not forwarded.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use octocrab::Octocrab;
use tracing::debug;

use super::client::{ApiClient, ApiRequest, ApiResponse, Method};
use super::error::TransportError;

/// A GitHub API client.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates a client authenticated with a personal or installation token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl ApiClient for OctocrabClient {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        if !request.headers.is_empty() {
            debug!(
                url = %request.url,
                headers = ?request.headers.keys().collect::<Vec<_>>(),
                "Request headers are supplied by octocrab; ignoring caller headers"
            );
        }

        let url = request.url.as_str();
        let body = request.body.as_ref();
        let result = match request.method {
            Method::Get => self.client._get(url).await,
            Method::Post => self.client._post(url, body).await,
            Method::Patch => self.client._patch(url, body).await,
            Method::Put => self.client._put(url, body).await,
            Method::Delete => self.client._delete(url, body).await,
        };
        let response = result.map_err(TransportError::from_octocrab)?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(TransportError::from_octocrab)?;

        Ok(ApiResponse {
            status,
            headers,
            body: body.into_bytes(),
        })
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}
