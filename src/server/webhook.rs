//! Webhook endpoint handler.
//!
//! Verifies the delivery signature, builds an [`Event`], dispatches it
//! through the router, and reports what the handlers did. Handler failures
//! are reported in the body of a 200 response: GitHub redelivering the event
//! would rerun the handlers that already succeeded.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::router::DispatchResult;
use crate::types::DeliveryId;
use crate::webhooks::{Event, HEADER_DELIVERY, HEADER_EVENT, HEADER_SIGNATURE, SignatureError};

/// Errors that reject a delivery before dispatch.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) | WebhookError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Response body for a dispatched delivery.
#[derive(Debug, Serialize)]
pub struct DispatchSummary {
    pub delivery_id: String,
    pub handlers: usize,
    pub failed: usize,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub handler: String,
    pub error: String,
}

impl From<&DispatchResult> for DispatchSummary {
    fn from(result: &DispatchResult) -> Self {
        let failures: Vec<FailureSummary> = result
            .failures()
            .map(|outcome| FailureSummary {
                handler: outcome.handler.clone(),
                error: outcome
                    .error()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            })
            .collect();
        DispatchSummary {
            delivery_id: result.delivery_id().to_string(),
            handlers: result.len(),
            failed: failures.len(),
            failures,
        }
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: Event kind (e.g., "check_run", "issue_comment")
///   - `X-GitHub-Delivery`: Unique delivery ID
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the payload
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 200 OK: Dispatched; body is a [`DispatchSummary`]
/// - 400 Bad Request: Missing header or invalid JSON
/// - 401 Unauthorized: Invalid signature
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DispatchSummary>, WebhookError> {
    let kind = get_header(&headers, HEADER_EVENT)?;
    let delivery_id = DeliveryId::new(get_header(&headers, HEADER_DELIVERY)?);
    let signature = get_header(&headers, HEADER_SIGNATURE)?;

    debug!(delivery_id = %delivery_id, kind = %kind, "Received webhook");

    // Verify before parsing anything.
    if let Err(e) = app_state.webhook_secret().verify(&body, &signature) {
        warn!(delivery_id = %delivery_id, error = %e, "Invalid webhook signature");
        return Err(e.into());
    }

    let event = Event::from_body(kind, delivery_id, &body)?;
    let result = app_state
        .router()
        .dispatch(&event, app_state.client())
        .await;

    Ok(Json(DispatchSummary::from(&result)))
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}
