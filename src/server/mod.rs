//! HTTP server for the bot.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Verifies and dispatches a GitHub webhook delivery
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use axum::http::StatusCode;

pub mod webhook;

pub use webhook::{DispatchSummary, WebhookError, webhook_handler};

use crate::github::ApiClient;
use crate::router::Router;
use crate::webhooks::WebhookSecret;

/// Shared application state, passed to handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    router: Router,
    /// Client handed to every dispatch.
    client: Arc<dyn ApiClient>,
    webhook_secret: WebhookSecret,
}

impl AppState {
    pub fn new(router: Router, client: Arc<dyn ApiClient>, webhook_secret: WebhookSecret) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                router,
                client,
                webhook_secret,
            }),
        }
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn client(&self) -> &dyn ApiClient {
        self.inner.client.as_ref()
    }

    pub fn webhook_secret(&self) -> &WebhookSecret {
        &self.inner.webhook_secret
    }
}

/// Liveness check.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
