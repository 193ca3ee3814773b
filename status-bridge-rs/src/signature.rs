//! Webhook signature verification
//!
//! Deliveries carry an `X-PagerDuty-Signature` header holding one or more
//! comma-separated `v1=<hex>` entries (several while a secret is being
//! rotated). Each entry is a lowercase hex HMAC-SHA256 of the raw body keyed
//! with the shared secret; one matching entry authenticates the delivery.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signatures
pub const SIGNATURE_HEADER: &str = "x-pagerduty-signature";

/// Largest body accepted for verification
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const SCHEME_PREFIX: &str = "v1=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Header missing, empty or without a decodable `v1=` entry
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    /// Body unreadable or too large
    #[error("malformed body: {0}")]
    MalformedBody(String),

    #[error("no valid signatures")]
    NoValidSignatures,

    #[error("signature verification failed: {0}")]
    Internal(String),
}

fn keyed_mac(secret: &str) -> Result<HmacSha256, SignatureError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Internal(format!("invalid HMAC key: {}", e)))
}

/// Decoded `v1` signatures found in the request headers
fn candidate_signatures(headers: &HeaderMap) -> Result<Vec<Vec<u8>>, SignatureError> {
    let mut values = headers.get_all(SIGNATURE_HEADER).iter().peekable();
    if values.peek().is_none() {
        return Err(SignatureError::MalformedHeader(format!(
            "missing {} header",
            SIGNATURE_HEADER
        )));
    }

    let mut signatures = Vec::new();
    for value in values {
        let value = value
            .to_str()
            .map_err(|_| SignatureError::MalformedHeader("header is not valid ASCII".to_string()))?;

        signatures.extend(
            value
                .split(',')
                .filter_map(|entry| entry.trim().strip_prefix(SCHEME_PREFIX))
                .filter_map(|encoded| hex::decode(encoded).ok()),
        );
    }

    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader(
            "no v1 signature entries".to_string(),
        ));
    }
    Ok(signatures)
}

/// Verify that `body` was signed with `secret`
pub fn verify_signature(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<(), SignatureError> {
    if body.len() > MAX_BODY_BYTES {
        return Err(SignatureError::MalformedBody(format!(
            "body of {} bytes exceeds the {} byte limit",
            body.len(),
            MAX_BODY_BYTES
        )));
    }

    for signature in candidate_signatures(headers)? {
        let mut mac = keyed_mac(secret)?;
        mac.update(body);
        if mac.verify_slice(&signature).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::NoValidSignatures)
}

/// Header value signing `body` with `secret`
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = keyed_mac(secret)?;
    mac.update(body);
    Ok(format!("{}{}", SCHEME_PREFIX, hex::encode(mac.finalize().into_bytes())))
}
