//! Signed invoice preview links.
//!
//! A token is `base64url("invoice:<uuid>.<hex hmac>")`. Opening the link
//! marks the invoice viewed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use invoicing_core::error::AppError;
use invoicing_core::utils::signature;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

const PAYLOAD_PREFIX: &str = "invoice:";

#[derive(Debug, Clone)]
pub struct PreviewTokens {
    secret: SecretString,
    base_url: String,
}

impl PreviewTokens {
    pub fn new(secret: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            secret,
            base_url: base_url.into(),
        }
    }

    pub fn encode(&self, invoice_id: Uuid) -> Result<String, AppError> {
        let payload = format!("{}{}", PAYLOAD_PREFIX, invoice_id);
        let sig = signature::sign(self.secret.expose_secret(), &payload)?;
        Ok(URL_SAFE_NO_PAD.encode(format!("{}.{}", payload, sig)))
    }

    /// Invoice ID carried by a token. Malformed or forged tokens are a `BadRequest`.
    pub fn decode(&self, token: &str) -> Result<Uuid, AppError> {
        let invalid = || AppError::BadRequest(anyhow::anyhow!("Invalid preview token"));

        let raw = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
        let raw = String::from_utf8(raw).map_err(|_| invalid())?;
        let (payload, sig) = raw.rsplit_once('.').ok_or_else(invalid)?;

        if !signature::verify(self.secret.expose_secret(), payload, sig)? {
            tracing::warn!("Preview token signature mismatch");
            return Err(invalid());
        }

        payload
            .strip_prefix(PAYLOAD_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(invalid)
    }

    pub fn url(&self, invoice_id: Uuid) -> Result<String, AppError> {
        Ok(format!(
            "{}/invoices/preview/{}",
            self.base_url.trim_end_matches('/'),
            self.encode(invoice_id)?
        ))
    }
}
