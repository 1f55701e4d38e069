use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::payload::ValidatedPayload;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded HMAC-SHA256 tag
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Sign a payload with `key`, returning the lowercase hex tag.
pub fn sign(payload: &ValidatedPayload, key: &[u8]) -> String {
    SignatureEngine::new(key).sign(payload)
}

/// Check `candidate` against the signature of `payload` under `key`.
pub fn verify(payload: &ValidatedPayload, key: &[u8], candidate: &str) -> bool {
    SignatureEngine::new(key).verify(payload, candidate)
}

/// HMAC-SHA256 signer and verifier bound to one secret key
///
/// The key is absorbed into a keyed MAC state at construction and is not
/// retained in any other form. `Debug` never prints key material.
///
/// # Example
///
/// ```rust
/// use yaya_webhook::webhooks::{SignatureEngine, WebhookPayload};
///
/// let payload = WebhookPayload::from(serde_json::json!({
///     "id": "tx1", "amount": 100, "currency": "ETB",
///     "created_at_time": 1000, "timestamp": 1700000000,
///     "cause": "test", "full_name": "A B", "account_name": "acct",
///     "invoice_url": "http://x"
/// }))
/// .validate()
/// .unwrap();
///
/// let engine = SignatureEngine::new(b"secret");
/// let signature = engine.sign(&payload);
/// assert!(engine.verify(&payload, &signature));
/// ```
#[derive(Clone)]
pub struct SignatureEngine {
    mac: HmacSha256,
}

impl SignatureEngine {
    pub fn new(key: &[u8]) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(key).expect("HMAC can take key of any size"),
        }
    }

    fn compute(&self, payload: &ValidatedPayload) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(&payload.canonicalize());
        mac.finalize().into_bytes().to_vec()
    }

    /// Lowercase hex HMAC-SHA256 of the payload's canonical form
    pub fn sign(&self, payload: &ValidatedPayload) -> String {
        hex::encode(self.compute(payload))
    }

    /// Verify a hex signature in constant time.
    ///
    /// Rejects on length first, then decodes the candidate (either hex case)
    /// and compares bytes with [`ConstantTimeEq`]. Undecodable input is
    /// simply invalid.
    pub fn verify(&self, payload: &ValidatedPayload, candidate: &str) -> bool {
        if candidate.len() != SIGNATURE_HEX_LEN {
            tracing::debug!(length = candidate.len(), "Signature has wrong length");
            return false;
        }

        let provided = match hex::decode(candidate) {
            Ok(bytes) => bytes,
            Err(_) => {
                tracing::debug!("Failed to decode webhook signature");
                return false;
            }
        };

        let expected = self.compute(payload);
        expected.ct_eq(&provided).into()
    }
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("algorithm", &"HMAC-SHA256")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::payload::WebhookPayload;
    use serde_json::{Value, json};

    fn sample_json(timestamp: i64) -> Value {
        json!({
            "id": "tx1",
            "amount": 100,
            "currency": "ETB",
            "created_at_time": 1000,
            "timestamp": timestamp,
            "cause": "test",
            "full_name": "A B",
            "account_name": "acct",
            "invoice_url": "http://x"
        })
    }

    fn validated(value: Value) -> ValidatedPayload {
        WebhookPayload::from(value).validate().unwrap()
    }

    /// Independent HMAC over an explicit concatenation
    fn reference_signature(key: &[u8], message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_matches_reference_concatenation() {
        let now = 1_700_000_123;
        let payload = validated(sample_json(now));
        let message = format!("tx1100ETB1000{}testA Baccthttp://x", now);

        let signature = sign(&payload, b"secret");
        assert_eq!(signature, reference_signature(b"secret", &message));
        assert_eq!(signature.len(), SIGNATURE_HEX_LEN);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        assert!(verify(&payload, b"secret", &signature));
        assert!(!verify(&payload, b"wrong", &signature));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let engine = SignatureEngine::new(b"secret");
        let payload = validated(sample_json(1_700_000_000));
        assert_eq!(engine.sign(&payload), engine.sign(&payload));
    }

    #[test]
    fn test_every_field_is_covered() {
        let engine = SignatureEngine::new(b"secret");
        let original = sample_json(1_700_000_000);
        let signature = engine.sign(&validated(original.clone()));

        let mutations = [
            ("id", json!("tx2")),
            ("amount", json!(101)),
            ("currency", json!("USD")),
            ("created_at_time", json!(1001)),
            ("timestamp", json!(1_700_000_001)),
            ("cause", json!("other")),
            ("full_name", json!("A C")),
            ("account_name", json!("acct2")),
            ("invoice_url", json!("http://y")),
        ];

        for (field, value) in mutations {
            let mut tampered = original.clone();
            tampered[field] = value;
            assert!(
                !engine.verify(&validated(tampered), &signature),
                "changing '{}' should invalidate the signature",
                field
            );
        }
    }

    #[test]
    fn test_uppercase_hex_is_accepted() {
        let engine = SignatureEngine::new(b"secret");
        let payload = validated(sample_json(1_700_000_000));
        let signature = engine.sign(&payload).to_uppercase();
        assert!(engine.verify(&payload, &signature));
    }

    #[test]
    fn test_malformed_candidates_fail_closed() {
        let engine = SignatureEngine::new(b"secret");
        let payload = validated(sample_json(1_700_000_000));
        let good = engine.sign(&payload);

        let truncated = &good[..SIGNATURE_HEX_LEN - 2];
        let extended = format!("{}00", good);
        let not_hex = "zz".repeat(SIGNATURE_HEX_LEN / 2);

        for candidate in ["", "abc", truncated, extended.as_str(), not_hex.as_str()] {
            assert!(!engine.verify(&payload, candidate), "'{}' should fail", candidate);
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let engine = SignatureEngine::new(b"super-secret-key");
        let debug = format!("{:?}", engine);
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("REDACTED"));
    }
}
