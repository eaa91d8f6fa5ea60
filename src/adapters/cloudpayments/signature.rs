//! CloudPayments webhook signature check.
//!
//! CloudPayments signs each notification body with HMAC-SHA256 keyed by the
//! API secret and sends the base64 digest in the `Content-HMAC` header.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body digest.
pub const CONTENT_HMAC_HEADER: &str = "Content-HMAC";

/// Verifies `Content-HMAC` headers against raw request bodies.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
        }
    }

    /// Base64 HMAC-SHA256 of `body`.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).ok()?;
        mac.update(body);
        Some(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Returns true when `header` is the digest of `body`.
    ///
    /// Comparison is constant-time over the decoded bytes.
    pub fn verify(&self, body: &[u8], header: &str) -> bool {
        let Ok(provided) = STANDARD.decode(header.trim()) else {
            tracing::warn!("Content-HMAC header is not valid base64");
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()) else {
            return false;
        };
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        let matches = expected.as_slice().ct_eq(&provided).unwrap_u8() == 1;
        if !matches {
            tracing::warn!("Invalid CloudPayments webhook signature");
        }
        matches
    }
}
