//! Webhook intake: signature verification and the [`Event`] value.
//!
//! GitHub webhooks include these headers:
//! - `X-GitHub-Event` - Event kind (e.g., "check_run")
//! - `X-GitHub-Delivery` - Unique delivery ID
//! - `X-Hub-Signature-256` - HMAC-SHA256 signature of the body

pub mod event;
pub mod signature;

pub use event::Event;
pub use signature::{SignatureError, WebhookSecret};

/// Header name for the event kind.
pub const HEADER_EVENT: &str = "x-github-event";
/// Header name for the delivery ID.
pub const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for the body signature.
pub const HEADER_SIGNATURE: &str = "x-hub-signature-256";
