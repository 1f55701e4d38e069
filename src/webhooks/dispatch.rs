//! Hand-off of accepted webhooks to downstream processing.
//!
//! The HTTP response for an accepted webhook never waits on this: payloads
//! are pushed onto a bounded channel and a single worker task drains it.

use crate::error::{Result, WebhookError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::payload::ValidatedPayload;

/// Downstream processing for an accepted webhook
///
/// # Example
///
/// ```rust,ignore
/// use yaya_webhook::webhooks::{ValidatedPayload, WebhookHandler};
///
/// struct MarkInvoicePaid {
///     db: DatabaseConnection,
/// }
///
/// #[async_trait]
/// impl WebhookHandler for MarkInvoicePaid {
///     async fn handle(&self, payload: &ValidatedPayload) -> Result<()> {
///         // Update the invoice referenced by payload.invoice_url()
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, payload: &ValidatedPayload) -> Result<()>;

    /// Called when `handle` fails. There is no retry.
    async fn on_error(&self, payload: &ValidatedPayload, error: &WebhookError) {
        tracing::error!(
            payment_id = payload.id(),
            error = %error,
            "Webhook processing failed"
        );
    }
}

/// Handler that records accepted payments in the log and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl WebhookHandler for LoggingHandler {
    async fn handle(&self, payload: &ValidatedPayload) -> Result<()> {
        tracing::info!(
            payment_id = payload.id(),
            amount = %payload.amount(),
            currency = payload.currency(),
            cause = payload.cause(),
            account_name = payload.account_name(),
            invoice_url = payload.invoice_url(),
            "Processing accepted webhook"
        );
        Ok(())
    }
}

/// Sending half of the post-acceptance queue
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<ValidatedPayload>,
}

impl Dispatcher {
    /// Start the worker task and return the dispatcher feeding it.
    ///
    /// The worker exits once every `Dispatcher` clone has been dropped and
    /// the queue is drained. Must be called inside a Tokio runtime.
    pub fn spawn(handler: Arc<dyn WebhookHandler>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ValidatedPayload>(capacity.max(1));

        let worker = tokio::spawn(async move {
            tracing::debug!(capacity, "Webhook dispatcher started");
            while let Some(payload) = rx.recv().await {
                if let Err(e) = handler.handle(&payload).await {
                    handler.on_error(&payload, &e).await;
                }
            }
            tracing::debug!("Webhook dispatcher stopped");
        });

        (Self { tx }, worker)
    }

    /// Queue a payload without waiting.
    ///
    /// Returns `false` if the queue is full or the worker is gone; the
    /// payload is dropped and the failure is logged.
    pub fn dispatch(&self, payload: ValidatedPayload) -> bool {
        match self.tx.try_send(payload) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(payload)) => {
                tracing::error!(payment_id = payload.id(), "Dispatch queue full, dropping webhook");
                false
            }
            Err(mpsc::error::TrySendError::Closed(payload)) => {
                tracing::error!(payment_id = payload.id(), "Dispatcher stopped, dropping webhook");
                false
            }
        }
    }

    /// Free slots left in the queue
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("remaining_capacity", &self.remaining_capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}
