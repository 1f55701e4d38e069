use axum::http::HeaderName;
use std::sync::Arc;

use crate::config::WebhookConfig;
use crate::error::{Result, WebhookError};
use crate::webhooks::{Dispatcher, RequestGate, SignatureEngine};

/// Shared, read-only state handed to every handler
///
/// Everything in here is fixed at startup. Cloning is cheap (reference
/// counts and a channel sender).
#[derive(Clone, Debug)]
pub struct AppContext {
    pub gate: Arc<RequestGate>,
    pub signer: Arc<SignatureEngine>,
    pub dispatcher: Dispatcher,
    /// Header carrying the inbound signature
    pub signature_header: HeaderName,
    /// Whether to read the client address from proxy headers
    pub trust_proxy: bool,
}

impl AppContext {
    /// Build the context from configuration, keying the signer once.
    pub fn from_config(config: &WebhookConfig, dispatcher: Dispatcher) -> Result<Self> {
        let signer = Arc::new(SignatureEngine::new(config.secret_bytes()?));

        let gate = RequestGate::new(signer.clone(), config.allowlist())
            .with_replay_tolerance(config.replay_tolerance());

        let signature_header = HeaderName::try_from(config.signature_header.as_str())
            .map_err(|e| WebhookError::config(format!("Invalid signature header name: {}", e)))?;

        Ok(Self {
            gate: Arc::new(gate),
            signer,
            dispatcher,
            signature_header,
            trust_proxy: config.trust_proxy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::webhooks::LoggingHandler;
    use std::time::Duration;

    #[tokio::test]
    async fn test_from_config() {
        let config = ConfigBuilder::new()
            .with_secret_key("secret")
            .with_signature_header("X-Yaya-Signature")
            .with_replay_tolerance_seconds(120)
            .build()
            .unwrap();
        let (dispatcher, _worker) = Dispatcher::spawn(Arc::new(LoggingHandler), 4);

        let ctx = AppContext::from_config(&config.webhook, dispatcher).unwrap();
        assert_eq!(ctx.signature_header.as_str(), "x-yaya-signature");
        assert_eq!(ctx.gate.replay_tolerance(), Duration::from_secs(120));
        assert!(ctx.gate.allowlist().contains("::1".parse().unwrap()));
        assert!(!ctx.trust_proxy);
    }

    #[tokio::test]
    async fn test_from_config_without_secret() {
        let config = WebhookConfig::default();
        let (dispatcher, _worker) = Dispatcher::spawn(Arc::new(LoggingHandler), 4);

        let err = AppContext::from_config(&config, dispatcher).unwrap_err();
        assert!(matches!(err, WebhookError::Config(_)));
    }
}
