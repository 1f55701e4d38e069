//! Payload validation and canonical serialization.
//!
//! The canonical form is what both sides feed to HMAC-SHA256: the nine
//! payload fields concatenated in a fixed order with no delimiters. Any
//! difference in how a number is rendered between signer and verifier breaks
//! every signature, so rendering lives in exactly one place ([`Amount`] and
//! [`ValidatedPayload::canonicalize`]).

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;

use crate::error::Result;

/// Largest integer an IEEE-754 double represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// The fields of a webhook payload, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadField {
    Id,
    Amount,
    Currency,
    CreatedAtTime,
    Timestamp,
    Cause,
    FullName,
    AccountName,
    InvoiceUrl,
}

impl PayloadField {
    /// All fields in the order they are concatenated for signing.
    pub const CANONICAL_ORDER: [PayloadField; 9] = [
        PayloadField::Id,
        PayloadField::Amount,
        PayloadField::Currency,
        PayloadField::CreatedAtTime,
        PayloadField::Timestamp,
        PayloadField::Cause,
        PayloadField::FullName,
        PayloadField::AccountName,
        PayloadField::InvoiceUrl,
    ];

    /// JSON key of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadField::Id => "id",
            PayloadField::Amount => "amount",
            PayloadField::Currency => "currency",
            PayloadField::CreatedAtTime => "created_at_time",
            PayloadField::Timestamp => "timestamp",
            PayloadField::Cause => "cause",
            PayloadField::FullName => "full_name",
            PayloadField::AccountName => "account_name",
            PayloadField::InvoiceUrl => "invoice_url",
        }
    }

    /// Label used in type errors. Both time fields report as "timestamp".
    pub fn type_label(self) -> &'static str {
        match self {
            PayloadField::CreatedAtTime | PayloadField::Timestamp => "timestamp",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for PayloadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a payload fails validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Field absent, `null`, `false`, empty string or numeric zero
    #[error("Missing required field: {0}")]
    MissingField(PayloadField),

    /// Field present but of the wrong JSON type
    #[error("Invalid {} type", .0.type_label())]
    InvalidType(PayloadField),
}

impl ValidationError {
    pub fn field(&self) -> PayloadField {
        match self {
            ValidationError::MissingField(field) | ValidationError::InvalidType(field) => *field,
        }
    }
}

/// An inbound payload exactly as received, before any checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WebhookPayload {
    fields: Map<String, Value>,
}

impl WebhookPayload {
    /// Parse a request body.
    ///
    /// An empty body and any JSON value that is not an object are treated as
    /// an object with no fields, so they fail validation on `id` rather than
    /// at parse time.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(body)?;
        Ok(Self::from(value))
    }

    pub fn get(&self, field: PayloadField) -> Option<&Value> {
        self.fields.get(field.as_str())
    }

    /// Check presence and types, producing a payload that can be signed.
    ///
    /// Presence is checked for every field before any type check, so a
    /// payload missing `invoice_url` with a string `amount` reports the
    /// missing field.
    pub fn validate(&self) -> std::result::Result<ValidatedPayload, ValidationError> {
        for field in PayloadField::CANONICAL_ORDER {
            if self.get(field).is_none_or(is_falsy) {
                return Err(ValidationError::MissingField(field));
            }
        }

        let amount = match self.get(PayloadField::Amount) {
            Some(Value::Number(n)) => Amount(n.clone()),
            _ => return Err(ValidationError::InvalidType(PayloadField::Amount)),
        };
        let created_at_time = self.integer(PayloadField::CreatedAtTime)?;
        let timestamp = self.integer(PayloadField::Timestamp)?;

        Ok(ValidatedPayload {
            id: self.string(PayloadField::Id)?,
            amount,
            currency: self.string(PayloadField::Currency)?,
            created_at_time,
            timestamp,
            cause: self.string(PayloadField::Cause)?,
            full_name: self.string(PayloadField::FullName)?,
            account_name: self.string(PayloadField::AccountName)?,
            invoice_url: self.string(PayloadField::InvoiceUrl)?,
        })
    }

    fn integer(&self, field: PayloadField) -> std::result::Result<i64, ValidationError> {
        match self.get(field) {
            Some(Value::Number(n)) => integral(n).ok_or(ValidationError::InvalidType(field)),
            _ => Err(ValidationError::InvalidType(field)),
        }
    }

    fn string(&self, field: PayloadField) -> std::result::Result<String, ValidationError> {
        match self.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(ValidationError::InvalidType(field)),
        }
    }
}

impl From<Value> for WebhookPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Integer value of a JSON number, accepting integral floats such as `1000.0`.
fn integral(n: &Number) -> Option<i64> {
    if let Some(v) = n.as_i64() {
        return Some(v);
    }
    let v = n.as_f64()?;
    (v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER).then_some(v as i64)
}

/// A payment amount, kept as the JSON number it arrived as.
///
/// Renders exactly as JavaScript's `amount.toString()` would: `100.0`
/// becomes `100`, `1e21` becomes `1e+21`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Amount(Number);

impl Amount {
    pub fn as_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&js_number_string(self.as_f64()))
    }
}

/// Render a double the way ECMAScript `Number::toString` does.
///
/// Uses the shortest round-trip digits, plain notation for magnitudes in
/// `[1e-6, 1e21)` and `d.ddde±x` outside it. Integers above 2^53 have
/// already been rounded by the conversion to `f64`, as they would be by a
/// JavaScript signer.
fn js_number_string(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sign = if v < 0.0 { "-" } else { "" };

    // Shortest digits in scientific form, e.g. "2.5075e2" or "1e-7".
    let sci = format!("{:e}", v.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let k = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, e_sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, e_sign, e.abs())
        }
    };

    format!("{}{}", sign, body)
}

/// A payload that passed [`WebhookPayload::validate`].
///
/// Only this type can be canonicalized or signed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedPayload {
    id: String,
    amount: Amount,
    currency: String,
    created_at_time: i64,
    timestamp: i64,
    cause: String,
    full_name: String,
    account_name: String,
    invoice_url: String,
}

impl ValidatedPayload {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn created_at_time(&self) -> i64 {
        self.created_at_time
    }

    /// Unix seconds at which the provider signed the payload
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn invoice_url(&self) -> &str {
        &self.invoice_url
    }

    /// The exact bytes covered by the signature.
    pub fn canonicalize(&self) -> Vec<u8> {
        let amount = self.amount.to_string();
        // i64 -> f64 rounds to nearest, matching how JavaScript parses the literal.
        let created_at_time = js_number_string(self.created_at_time as f64);
        let timestamp = js_number_string(self.timestamp as f64);

        let parts: [&str; 9] = [
            self.id.as_str(),
            amount.as_str(),
            self.currency.as_str(),
            created_at_time.as_str(),
            timestamp.as_str(),
            self.cause.as_str(),
            self.full_name.as_str(),
            self.account_name.as_str(),
            self.invoice_url.as_str(),
        ];

        let mut out = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in parts {
            out.extend_from_slice(part.as_bytes());
        }
        out
    }
}
