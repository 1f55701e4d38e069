use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::app::AppContext;
use crate::error::Result;
use crate::health;
use crate::webhooks::{InboundWebhook, WebhookPayload};

use super::extract::ClientIp;
use super::routes::RouteModule;

/// Body returned by `POST /generate-signature`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub signature: String,
}

/// Routes for receiving and signing YaYa Wallet webhooks
///
/// - `POST /webhook`: admission-checked webhook receipt
/// - `POST /generate-signature`: signs a payload with the shared key,
///   mounted only when `signing_endpoint` is true
/// - `GET /health`
#[derive(Debug, Clone, Copy)]
pub struct WebhookModule {
    signing_endpoint: bool,
}

impl WebhookModule {
    pub fn new(signing_endpoint: bool) -> Self {
        Self { signing_endpoint }
    }
}

impl RouteModule for WebhookModule {
    fn routes(&self) -> Router<AppContext> {
        let router = Router::new()
            .route("/webhook", post(receive_webhook))
            .route("/health", get(health::health_handler));

        if self.signing_endpoint {
            router.route("/generate-signature", post(generate_signature))
        } else {
            router
        }
    }
}

async fn generate_signature(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SignatureResponse>> {
    let payload = WebhookPayload::from_slice(json_body(&headers, &body))?.validate()?;
    let signature = ctx.signer.sign(&payload);

    tracing::debug!(payment_id = payload.id(), "Generated signature");

    Ok(Json(SignatureResponse { signature }))
}

async fn receive_webhook(
    State(ctx): State<AppContext>,
    ClientIp(source): ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    tracing::debug!(%source, "Webhook delivery received");

    let signature = headers
        .get(&ctx.signature_header)
        .and_then(|v| v.to_str().ok());

    let payload = ctx.gate.admit(&InboundWebhook {
        source,
        signature,
        body: json_body(&headers, &body),
    })?;

    tracing::info!(
        payment_id = payload.id(),
        amount = %payload.amount(),
        currency = payload.currency(),
        %source,
        "Valid webhook"
    );

    // Respond immediately; processing happens on the dispatcher worker.
    ctx.dispatcher.dispatch(payload);

    Ok("Webhook received successfully")
}

/// The body if the request declares `application/json`, otherwise empty.
///
/// Anything else is read as an empty object and so fails validation on `id`.
fn json_body<'a>(headers: &HeaderMap, body: &'a [u8]) -> &'a [u8] {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"));

    if is_json { body } else { &[] }
}
