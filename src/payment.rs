//! Payment-order issuance and signature verification.
//!
//! The payment collaborator is external: it collects the money and calls
//! back with `(order_id, payment_id, signature)`. The server's only
//! cryptographic obligation is to refuse confirmation unless the signature
//! is a valid HMAC-SHA256 over `order_id + "|" + payment_id` under the
//! shared secret. A mismatch is a hard rejection, never retried.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use sha2::Sha256;

use crate::domain::RegistrationId;
use crate::error::ServerError;

type HmacSha256 = Hmac<Sha256>;

/// Length of the random part of generated order ids.
const ORDER_ID_LEN: usize = 16;

/// An order opened against the payment collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOrder {
    /// Collaborator-facing order identifier.
    pub order_id: String,
    /// Registration the order pays for.
    pub registration_id: RegistrationId,
    /// Amount owed, in minor units.
    pub amount: u32,
    /// Currency code.
    pub currency: &'static str,
    /// Order creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Verifies payment callbacks against the shared secret.
#[derive(Clone)]
pub struct PaymentVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for PaymentVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("PaymentVerifier").finish_non_exhaustive()
    }
}

impl PaymentVerifier {
    /// Creates a verifier over the given shared secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Opens a payment order for a registration, minting a random order id.
    #[must_use]
    pub fn open_order(&self, registration_id: RegistrationId, amount: u32) -> PaymentOrder {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ORDER_ID_LEN)
            .map(char::from)
            .collect();
        PaymentOrder {
            order_id: format!("order_{suffix}"),
            registration_id,
            amount,
            currency: "INR",
            created_at: Utc::now(),
        }
    }

    /// Computes the expected signature for an `(order_id, payment_id)`
    /// pair. Exposed so the demo collaborator and the tests can produce
    /// valid callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Internal`] if the HMAC key is unusable.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String, ServerError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("hmac key: {e}")))?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Verifies a payment callback signature.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SignatureMismatch`] on a malformed or wrong
    /// signature, or [`ServerError::Internal`] if the HMAC key is unusable.
    pub fn verify(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), ServerError> {
        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| ServerError::SignatureMismatch)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("hmac key: {e}")))?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| ServerError::SignatureMismatch)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_verifier() -> PaymentVerifier {
        PaymentVerifier::new(*b"test-payment-secret")
    }

    #[test]
    fn valid_signature_verifies() {
        let verifier = make_verifier();
        let sig = verifier.sign("order_abc", "pay_123");
        let Ok(sig) = sig else {
            panic!("signing must succeed");
        };
        assert!(verifier.verify("order_abc", "pay_123", &sig).is_ok());
    }

    #[test]
    fn tampered_payment_id_is_rejected() {
        let verifier = make_verifier();
        let sig = verifier.sign("order_abc", "pay_123").unwrap_or_default();
        let result = verifier.verify("order_abc", "pay_999", &sig);
        assert!(matches!(result, Err(ServerError::SignatureMismatch)));
    }

    #[test]
    fn garbage_signature_is_rejected_not_a_panic() {
        let verifier = make_verifier();
        for sig in ["", "!!!", "AAAA", "not base64 at all %%"] {
            let result = verifier.verify("order_abc", "pay_123", sig);
            assert!(matches!(result, Err(ServerError::SignatureMismatch)));
        }
    }

    #[test]
    fn different_secrets_do_not_cross_verify() {
        let a = PaymentVerifier::new(*b"secret-a");
        let b = PaymentVerifier::new(*b"secret-b");
        let sig = a.sign("order_abc", "pay_123").unwrap_or_default();
        assert!(b.verify("order_abc", "pay_123", &sig).is_err());
    }

    #[test]
    fn order_ids_are_unique_and_prefixed() {
        let verifier = make_verifier();
        let a = verifier.open_order(RegistrationId::new(), 100);
        let b = verifier.open_order(RegistrationId::new(), 100);
        assert!(a.order_id.starts_with("order_"));
        assert_ne!(a.order_id, b.order_id);
        assert_eq!(a.amount, 100);
    }
}
