use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Result, WebhookError};

use super::allowlist::SourceAllowlist;
use super::payload::{ValidatedPayload, WebhookPayload};
use super::signature::SignatureEngine;

/// Default replay window
pub const DEFAULT_REPLAY_TOLERANCE: Duration = Duration::from_secs(300);

/// One inbound webhook delivery, as seen by the gate
#[derive(Debug, Clone, Copy)]
pub struct InboundWebhook<'a> {
    /// Address of the peer that delivered the request
    pub source: IpAddr,
    /// Signature header value, if the header was sent
    pub signature: Option<&'a str>,
    /// Raw request body
    pub body: &'a [u8],
}

/// Admission checks for inbound webhooks
///
/// Checks run cheapest first and stop at the first failure:
/// 1. source address is allowlisted
/// 2. a signature was supplied
/// 3. the body is a well-formed payload
/// 4. the payload timestamp is inside the replay window
/// 5. the signature matches
///
/// Timestamps ahead of the local clock are not rejected; only age is bounded.
#[derive(Debug, Clone)]
pub struct RequestGate {
    engine: Arc<SignatureEngine>,
    allowlist: SourceAllowlist,
    replay_tolerance: Duration,
}

impl RequestGate {
    pub fn new(engine: Arc<SignatureEngine>, allowlist: SourceAllowlist) -> Self {
        Self {
            engine,
            allowlist,
            replay_tolerance: DEFAULT_REPLAY_TOLERANCE,
        }
    }

    pub fn with_replay_tolerance(mut self, tolerance: Duration) -> Self {
        self.replay_tolerance = tolerance;
        self
    }

    pub fn allowlist(&self) -> &SourceAllowlist {
        &self.allowlist
    }

    pub fn replay_tolerance(&self) -> Duration {
        self.replay_tolerance
    }

    /// Run all checks against the current wall clock.
    pub fn admit(&self, request: &InboundWebhook<'_>) -> Result<ValidatedPayload> {
        self.admit_at(request, unix_now()?)
    }

    /// Run all checks with `now` (unix seconds) as the current time.
    pub fn admit_at(&self, request: &InboundWebhook<'_>, now: i64) -> Result<ValidatedPayload> {
        if !self.allowlist.contains(request.source) {
            return Err(WebhookError::ForbiddenSource(request.source));
        }

        let signature = match request.signature {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Err(WebhookError::MissingSignature),
        };

        let payload = WebhookPayload::from_slice(request.body)?.validate()?;

        let age_seconds = now.saturating_sub(payload.timestamp());
        if age_seconds > self.tolerance_seconds() {
            return Err(WebhookError::StaleRequest { age_seconds });
        }

        if !self.engine.verify(&payload, signature) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(payload)
    }

    fn tolerance_seconds(&self) -> i64 {
        i64::try_from(self.replay_tolerance.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Current unix time in whole seconds
pub fn unix_now() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| WebhookError::internal(format!("System time error: {}", e)))?;
    i64::try_from(elapsed.as_secs())
        .map_err(|_| WebhookError::internal("System time out of range"))
}
