use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed delivery.
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureError {
    Malformed,
    Expired,
    Mismatch,
}

/// Verifies a `t=<unix>,v1=<hex>` header against HMAC-SHA256 of `"{t}.{body}"`.
/// Any one matching `v1` entry is accepted.
pub fn verify(header: &str, body: &[u8], secret: &str, now: DateTime<Utc>) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now.timestamp() - timestamp).abs() > TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    for candidate in signatures {
        let Ok(expected) = hex::decode(candidate) else { continue };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

/// Builds a header the way the gateway does. Used by tests and local tooling.
pub fn sign(body: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "whsec_test";

    #[test]
    fn test_valid_signature() {
        let now = Utc::now();
        let body = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign(body, SECRET, now.timestamp()).unwrap();
        assert_eq!(verify(&header, body, SECRET, now), Ok(()));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let now = Utc::now();
        let header = sign(b"original", SECRET, now.timestamp()).unwrap();
        assert_eq!(verify(&header, b"tampered", SECRET, now), Err(SignatureError::Mismatch));
        assert_eq!(verify(&header, b"original", "other", now), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_old_deliveries_are_rejected() {
        let now = Utc::now();
        let header = sign(b"body", SECRET, (now - Duration::minutes(10)).timestamp()).unwrap();
        assert_eq!(verify(&header, b"body", SECRET, now), Err(SignatureError::Expired));
    }

    #[test]
    fn test_malformed_headers() {
        let now = Utc::now();
        assert_eq!(verify("", b"body", SECRET, now), Err(SignatureError::Malformed));
        assert_eq!(verify("t=abc,v1=00", b"body", SECRET, now), Err(SignatureError::Malformed));
        let only_ts = format!("t={}", now.timestamp());
        assert_eq!(verify(&only_ts, b"body", SECRET, now), Err(SignatureError::Malformed));
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let now = Utc::now();
        let good = sign(b"body", SECRET, now.timestamp()).unwrap();
        let header = format!("{},v1=deadbeef", good);
        assert_eq!(verify(&header, b"body", SECRET, now), Ok(()));
    }
}
