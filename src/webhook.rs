//! Discourse webhook signature verification.
//!
//! Discourse signs each delivery with HMAC-SHA256 over the raw request body,
//! keyed by the webhook secret, and sends it as
//! `X-Discourse-Event-Signature: sha256=<hex>`.

use std::fmt;

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-discourse-event-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("webhook secret is not configured")]
    MissingSecret,
    #[error("missing X-Discourse-Event-Signature header")]
    MissingSignature,
    #[error("malformed signature header")]
    MalformedSignature,
    #[error("signature does not match request body")]
    Mismatch,
}

/// Authenticates inbound webhook requests before any payload handling.
pub trait WebhookVerifier: Send + Sync {
    /// Check the request's signature against its raw body.
    ///
    /// # Errors
    ///
    /// Returns why the request could not be authenticated.
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), VerifyError>;
}

/// Verifies Discourse's HMAC-SHA256 body signature.
#[derive(Clone)]
pub struct HmacSha256Verifier {
    secret: Option<String>,
}

impl HmacSha256Verifier {
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }
}

impl fmt::Debug for HmacSha256Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSha256Verifier")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl WebhookVerifier for HmacSha256Verifier {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), VerifyError> {
        let secret = self.secret.as_deref().ok_or(VerifyError::MissingSecret)?;

        let header = headers
            .get(SIGNATURE_HEADER)
            .ok_or(VerifyError::MissingSignature)?
            .to_str()
            .map_err(|_| VerifyError::MalformedSignature)?;

        let expected = header
            .trim()
            .strip_prefix(SIGNATURE_PREFIX)
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or(VerifyError::MalformedSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| VerifyError::MissingSecret)?;
        mac.update(body);

        // verify_slice compares in constant time
        mac.verify_slice(&expected)
            .map_err(|_| VerifyError::Mismatch)
    }
}

/// Compute the signature header value Discourse would send for `body`.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(body);
    format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    )
}
