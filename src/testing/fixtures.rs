//! Payment fixtures for webhook tests

use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::webhooks::{PayloadField, WebhookPayload, sign, unix_now};

/// Key shared by the test fixtures and the test app
pub const TEST_SECRET: &str = "secret";

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    /// Generate a fake payment id
    pub fn payment_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a fake invoice URL
    pub fn invoice_url() -> String {
        format!("https://yayawallet.com/en/invoice/{}", Uuid::new_v4().simple())
    }

    /// Generate a fake account name
    pub fn account_name() -> String {
        format!("user_{}", &Uuid::new_v4().simple().to_string()[..8])
    }
}

/// Builder for a payment notification body
///
/// Starts complete and valid, timestamped now. Individual fields can be
/// overridden or removed to build rejection cases.
#[derive(Debug, Clone)]
pub struct TestPayment {
    fields: Map<String, Value>,
}

impl TestPayment {
    pub fn new() -> Self {
        let now = unix_now().unwrap();
        let value = json!({
            "id": fake::payment_id(),
            "amount": 100,
            "currency": "ETB",
            "created_at_time": now,
            "timestamp": now,
            "cause": "Testing",
            "full_name": "Abebe Kebede",
            "account_name": fake::account_name(),
            "invoice_url": fake::invoice_url(),
        });

        match value {
            Value::Object(fields) => Self { fields },
            _ => unreachable!(),
        }
    }

    /// Replace a field with an arbitrary JSON value
    pub fn with(mut self, field: PayloadField, value: impl Into<Value>) -> Self {
        self.fields.insert(field.as_str().to_string(), value.into());
        self
    }

    /// Set both `created_at_time` and `timestamp`
    pub fn at(self, unix_seconds: i64) -> Self {
        self.with(PayloadField::CreatedAtTime, unix_seconds)
            .with(PayloadField::Timestamp, unix_seconds)
    }

    /// Remove a field entirely
    pub fn without(mut self, field: PayloadField) -> Self {
        self.fields.remove(field.as_str());
        self
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Signature over the canonical form, as YaYa Wallet would compute it
    ///
    /// Panics if the payment is not valid.
    pub fn signature(&self, key: &str) -> String {
        let validated = WebhookPayload::from(self.to_json())
            .validate()
            .expect("fixture payment must be valid to sign");
        sign(&validated, key.as_bytes())
    }
}

impl Default for TestPayment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_is_valid() {
        let payment = TestPayment::new();
        assert!(WebhookPayload::from(payment.to_json()).validate().is_ok());
        assert_eq!(payment.signature(TEST_SECRET).len(), 64);
    }

    #[test]
    fn test_overrides() {
        let payment = TestPayment::new()
            .at(1_700_000_000)
            .with(PayloadField::Amount, 12.5)
            .without(PayloadField::Cause);
        let json = payment.to_json();

        assert_eq!(json["timestamp"], 1_700_000_000);
        assert_eq!(json["created_at_time"], 1_700_000_000);
        assert_eq!(json["amount"], 12.5);
        assert!(json.get("cause").is_none());
    }

    #[test]
    fn test_unique_ids() {
        assert_ne!(fake::payment_id(), fake::payment_id());
    }
}
