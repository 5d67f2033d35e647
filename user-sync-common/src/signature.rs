//! Webhook signature verification.
//!
//! Deliveries are signed with HMAC-SHA256 over `{msg_id}.{timestamp}.{payload}`
//! using the endpoint secret. The secret is distributed as `whsec_<base64>`.
//! Three headers carry the message id, the unix timestamp in seconds and a
//! space-separated list of `v1,<base64 signature>` entries; any matching `v1`
//! entry authenticates the delivery.
//!
//! The unbranded `webhook-*` header names are accepted when the `svix-*`
//! variants are absent.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;

use crate::event::WebhookEvent;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew between sender and receiver, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

const ID_HEADERS: [&str; 2] = ["svix-id", "webhook-id"];
const TIMESTAMP_HEADERS: [&str; 2] = ["svix-timestamp", "webhook-timestamp"];
const SIGNATURE_HEADERS: [&str; 2] = ["svix-signature", "webhook-signature"];

/// Reasons a delivery is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Invalid webhook secret")]
    InvalidSecret,
    #[error("Missing required headers")]
    MissingHeaders,
    #[error("Invalid signature headers")]
    InvalidHeaders,
    #[error("Message timestamp too old")]
    TimestampTooOld,
    #[error("Message timestamp too new")]
    TimestampTooNew,
    #[error("No matching signature found")]
    NoMatchingSignature,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Verifies signed deliveries and decodes them into [`WebhookEvent`]s.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
    tolerance_secs: i64,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("key", &"<redacted>")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

/// The three signature headers of one delivery.
struct SignatureHeaders<'a> {
    msg_id: &'a str,
    timestamp: &'a str,
    signatures: &'a str,
}

impl<'a> SignatureHeaders<'a> {
    fn from_header_map(headers: &'a HeaderMap) -> Result<Self, VerificationError> {
        Ok(Self {
            msg_id: first_header(headers, &ID_HEADERS)?,
            timestamp: first_header(headers, &TIMESTAMP_HEADERS)?,
            signatures: first_header(headers, &SIGNATURE_HEADERS)?,
        })
    }
}

fn first_header<'a>(
    headers: &'a HeaderMap,
    names: &[&str],
) -> Result<&'a str, VerificationError> {
    let value = names
        .iter()
        .find_map(|name| headers.get(*name))
        .ok_or(VerificationError::MissingHeaders)?;
    value.to_str().map_err(|_| VerificationError::InvalidHeaders)
}

impl WebhookVerifier {
    /// Build a verifier from a `whsec_`-prefixed (or bare) base64 secret.
    pub fn new(secret: &str) -> Result<Self, VerificationError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| VerificationError::InvalidSecret)?;
        if key.is_empty() {
            return Err(VerificationError::InvalidSecret);
        }

        Ok(Self {
            key,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        })
    }

    /// Override the accepted timestamp skew.
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub fn tolerance_secs(&self) -> i64 {
        self.tolerance_secs
    }

    /// Verify a delivery against the current clock and decode its payload.
    pub fn verify(
        &self,
        payload: &[u8],
        headers: &HeaderMap,
    ) -> Result<WebhookEvent, VerificationError> {
        self.verify_at(Utc::now().timestamp(), payload, headers)
    }

    /// Verify a delivery as of `now` (unix seconds) and decode its payload.
    ///
    /// The payload is only parsed once a signature has matched the exact
    /// bytes received.
    pub fn verify_at(
        &self,
        now: i64,
        payload: &[u8],
        headers: &HeaderMap,
    ) -> Result<WebhookEvent, VerificationError> {
        let headers = SignatureHeaders::from_header_map(headers)?;

        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| VerificationError::InvalidHeaders)?;
        // The header is untrusted; any i64 must compare without overflow.
        if now.saturating_sub(timestamp) > self.tolerance_secs {
            return Err(VerificationError::TimestampTooOld);
        }
        if timestamp.saturating_sub(now) > self.tolerance_secs {
            return Err(VerificationError::TimestampTooNew);
        }

        let mac = self.mac(headers.msg_id, timestamp, payload)?;
        let matched = headers
            .signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
            .any(|signature| mac.clone().verify_slice(&signature).is_ok());
        if !matched {
            return Err(VerificationError::NoMatchingSignature);
        }

        serde_json::from_slice(payload)
            .map_err(|e| VerificationError::InvalidPayload(e.to_string()))
    }

    /// Produce a `v1,<base64>` signature entry for a delivery.
    pub fn sign(
        &self,
        msg_id: &str,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<String, VerificationError> {
        let mac = self.mac(msg_id, timestamp, payload)?;
        Ok(format!(
            "{},{}",
            SIGNATURE_VERSION,
            STANDARD.encode(mac.finalize().into_bytes())
        ))
    }

    fn mac(
        &self,
        msg_id: &str,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<HmacSha256, VerificationError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| VerificationError::InvalidSecret)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}
