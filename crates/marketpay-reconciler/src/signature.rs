//! Webhook signature verification
//!
//! The provider signs the raw request body with HMAC-SHA512 and sends the
//! hex digest in a header. Verification happens before the body is parsed;
//! a failure performs no state change and is logged as a security event by
//! the caller.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use marketpay_types::{Result, SettleError};

type HmacSha512 = Hmac<Sha512>;

/// Verifies provider signatures against a shared webhook secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex HMAC-SHA512 digest of a raw body (also used by tests to forge
    /// valid signatures)
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(&self.secret)
            .expect("hmac accepts any key length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a signature header against the raw body, in constant time
    pub fn verify(&self, body: &[u8], signature_hex: &str) -> Result<()> {
        let provided = hex::decode(signature_hex.trim())
            .map_err(|_| SettleError::InvalidSignature)?;

        let mut mac = HmacSha512::new_from_slice(&self.secret)
            .expect("hmac accepts any key length");
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(provided.as_slice()).into() {
            Ok(())
        } else {
            Err(SettleError::InvalidSignature)
        }
    }
}
