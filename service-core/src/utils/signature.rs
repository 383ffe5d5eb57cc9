use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generate an HMAC-SHA256 signature over a timestamped payload.
///
/// Format: HMAC-SHA256("{timestamp}.{payload}", secret), hex-encoded.
pub fn generate_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let result = mac.finalize();

    Ok(hex::encode(result.into_bytes()))
}

/// Verify an HMAC-SHA256 signature using constant-time comparison.
pub fn verify_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected_signature = generate_signature(secret, timestamp, payload)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_generation_and_verification() {
        let secret = "whsec_test_key";
        let timestamp = 1678886400;
        let payload = br#"{"type":"invoice.paid"}"#;

        let signature = generate_signature(secret, timestamp, payload).unwrap();
        assert!(!signature.is_empty());

        let is_valid = verify_signature(secret, timestamp, payload, &signature).unwrap();
        assert!(is_valid);
    }

    #[test]
    fn test_invalid_signature() {
        let secret = "whsec_test_key";
        let timestamp = 1678886400;
        let payload = br#"{"type":"invoice.paid"}"#;

        let signature = generate_signature(secret, timestamp, payload).unwrap();
        let invalid_signature = format!("a{}", &signature[1..]);

        let is_valid = verify_signature(secret, timestamp, payload, &invalid_signature).unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_tampered_payload() {
        let secret = "whsec_test_key";
        let timestamp = 1678886400;
        let payload = br#"{"type":"invoice.paid"}"#;

        let signature = generate_signature(secret, timestamp, payload).unwrap();

        let modified = br#"{"type":"invoice.payment_failed"}"#;
        let is_valid = verify_signature(secret, timestamp, modified, &signature).unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_timestamp_is_bound_into_signature() {
        let secret = "whsec_test_key";
        let payload = br#"{"type":"invoice.paid"}"#;

        let signature = generate_signature(secret, 1678886400, payload).unwrap();
        let is_valid = verify_signature(secret, 1678886401, payload, &signature).unwrap();
        assert!(!is_valid);
    }
}
