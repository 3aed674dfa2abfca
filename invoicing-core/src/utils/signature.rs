use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &str, payload: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(payload.as_bytes());
    let result = mac.finalize();

    Ok(hex::encode(result.into_bytes()))
}

/// Verify a signature produced by [`sign`] using constant-time comparison.
pub fn verify(secret: &str, payload: &str, signature: &str) -> Result<bool, anyhow::Error> {
    let expected_signature = sign(secret, payload)?;

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
        let secret = "preview_secret";
        let payload = "invoice:5f0c3b4e-8d5e-4c1a-9d57-0c2a0b6f4a11";

        let signature = sign(secret, payload).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify(secret, payload, &signature).unwrap());
    }

    #[test]
    fn test_invalid_signature() {
        let secret = "preview_secret";
        let payload = "invoice:5f0c3b4e-8d5e-4c1a-9d57-0c2a0b6f4a11";
        let signature = sign(secret, payload).unwrap();

        assert!(!verify("other_secret", payload, &signature).unwrap());
        assert!(!verify(secret, "invoice:tampered", &signature).unwrap());
        assert!(!verify(secret, payload, "short").unwrap());
    }
}
