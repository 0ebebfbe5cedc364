//! Billing webhook signatures.
//!
//! The provider sends `t=<unix secs>,v1=<hex>` in the signature header, where
//! each `v1` is HMAC-SHA256 over `"{t}.{raw body}"` keyed by the endpoint
//! secret. Several `v1` entries may be present while a secret is rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age, in seconds, of a signed timestamp.
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("No webhook signing secret configured")]
    MissingSecret,
    #[error("Invalid webhook signing secret")]
    InvalidSecret,
    #[error("Missing signature header")]
    MissingHeader,
    #[error("Unable to extract timestamp and signatures from header")]
    Malformed,
    #[error("Timestamp outside the tolerance zone")]
    Stale,
    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,
}

fn keyed(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Build a signature header for `payload`, as the provider does.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let tag = keyed(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={},v1={}", timestamp, hex::encode(tag)))
}

/// Check `header` against `payload` at time `now_secs`.
pub fn verify(
    payload: &[u8],
    header: Option<&str>,
    secret: Option<&str>,
    now_secs: i64,
) -> Result<(), SignatureError> {
    let secret = secret.ok_or(SignatureError::MissingSecret)?;
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => {
                // Entries that are not hex can never match; skip them.
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now_secs.abs_diff(timestamp) > TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Stale);
    }

    let mac = keyed(secret, timestamp, payload)?;
    if signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok())
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
