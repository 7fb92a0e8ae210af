//! Webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs each delivery body with the webhook's shared secret and sends
//! the result in `X-Hub-Signature-256` as `sha256=<hex>`. Deliveries whose
//! signature does not verify are rejected before the body is parsed.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a signature header was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The header does not start with `sha256=`.
    #[error("signature header is not of the form sha256=<hex>")]
    UnsupportedFormat,

    /// The digest part is not valid hex.
    #[error("signature digest is not valid hex")]
    InvalidHex,

    /// The digest does not match the body.
    #[error("signature does not match payload")]
    Mismatch,
}

/// The shared secret configured on the GitHub webhook.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        WebhookSecret(secret.into())
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.0).expect("HMAC can take key of any size")
    }

    /// Returns the `X-Hub-Signature-256` header value for a payload.
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Verifies a signature header against a payload in constant time.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        let hex_sig = header
            .strip_prefix("sha256=")
            .ok_or(SignatureError::UnsupportedFormat)?;
        let expected = hex::decode(hex_sig).map_err(|_| SignatureError::InvalidHex)?;

        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}
