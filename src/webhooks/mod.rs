//! Webhook signing and admission.
//!
//! Provides payload canonicalization, HMAC-SHA256 signing with constant-time
//! verification, the admission gate for inbound deliveries, and the
//! asynchronous hand-off of accepted payloads.

pub mod allowlist;
pub mod dispatch;
pub mod gate;
pub mod payload;
pub mod signature;

pub use allowlist::SourceAllowlist;
pub use dispatch::{Dispatcher, LoggingHandler, WebhookHandler};
pub use gate::{DEFAULT_REPLAY_TOLERANCE, InboundWebhook, RequestGate, unix_now};
pub use payload::{Amount, PayloadField, ValidatedPayload, ValidationError, WebhookPayload};
pub use signature::{SIGNATURE_HEX_LEN, SignatureEngine, sign, verify};
