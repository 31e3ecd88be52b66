//! HMAC-SHA256 verification for the two payment trust paths.
//!
//! The payment gateway signs server-to-server webhook deliveries with the
//! webhook secret, over the raw request body. Checkout clients relay a
//! signature computed with the API key secret over
//! `"{payment_order_ref}|{payment_ref}"`. The two secrets are distinct and
//! never interchangeable; a signature valid under one path is rejected by
//! the other.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::BoxofficeError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies hex-encoded HMAC-SHA256 signatures from the payment gateway.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    api_secret: String,
    webhook_secret: String,
}

impl SignatureVerifier {
    /// Creates a verifier from the two gateway secrets.
    #[must_use]
    pub fn new(api_secret: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_secret: api_secret.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verifies a webhook delivery signature over the raw request body.
    ///
    /// The body must be the exact bytes received on the wire. Any
    /// re-serialization before signing breaks verification.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidSignature`] when the signature is
    /// not valid hex or does not match.
    pub fn verify_webhook(&self, raw_body: &[u8], signature_hex: &str) -> Result<(), BoxofficeError> {
        verify(&self.webhook_secret, raw_body, signature_hex)
    }

    /// Verifies a client-relayed signature over
    /// `"{payment_order_ref}|{payment_ref}"`.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidSignature`] when the signature is
    /// not valid hex or does not match.
    pub fn verify_client(
        &self,
        payment_order_ref: &str,
        payment_ref: &str,
        signature_hex: &str,
    ) -> Result<(), BoxofficeError> {
        let message = format!("{payment_order_ref}|{payment_ref}");
        verify(&self.api_secret, message.as_bytes(), signature_hex)
    }
}

/// Constant-time HMAC-SHA256 check of a hex-encoded signature.
fn verify(secret: &str, message: &[u8], signature_hex: &str) -> Result<(), BoxofficeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| BoxofficeError::Internal("hmac key initialization failed".to_string()))?;
    mac.update(message);
    let signature = hex::decode(signature_hex).map_err(|_| BoxofficeError::InvalidSignature)?;
    mac.verify_slice(&signature)
        .map_err(|_| BoxofficeError::InvalidSignature)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sign(secret: &str, message: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn webhook_signature_accepts_matching_body() {
        let verifier = SignatureVerifier::new("api_secret", "webhook_secret");
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign("webhook_secret", body);
        assert!(verifier.verify_webhook(body, &sig).is_ok());
    }

    #[test]
    fn webhook_signature_rejects_tampered_body() {
        let verifier = SignatureVerifier::new("api_secret", "webhook_secret");
        let sig = sign("webhook_secret", br#"{"amount":100}"#);
        let result = verifier.verify_webhook(br#"{"amount":999}"#, &sig);
        assert!(matches!(result, Err(BoxofficeError::InvalidSignature)));
    }

    #[test]
    fn webhook_signature_rejects_non_hex() {
        let verifier = SignatureVerifier::new("api_secret", "webhook_secret");
        let result = verifier.verify_webhook(b"body", "not-hex!");
        assert!(matches!(result, Err(BoxofficeError::InvalidSignature)));
    }

    #[test]
    fn client_signature_covers_order_and_payment_refs() {
        let verifier = SignatureVerifier::new("api_secret", "webhook_secret");
        let sig = sign("api_secret", b"order_abc|pay_xyz");
        assert!(verifier.verify_client("order_abc", "pay_xyz", &sig).is_ok());

        let swapped = verifier.verify_client("pay_xyz", "order_abc", &sig);
        assert!(matches!(swapped, Err(BoxofficeError::InvalidSignature)));
    }

    #[test]
    fn secrets_are_not_interchangeable() {
        let verifier = SignatureVerifier::new("api_secret", "webhook_secret");
        let sig = sign("webhook_secret", b"order_abc|pay_xyz");
        let result = verifier.verify_client("order_abc", "pay_xyz", &sig);
        assert!(matches!(result, Err(BoxofficeError::InvalidSignature)));
    }
}
