use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::app::AppContext;

/// Health check status
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check result for a single component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Overall health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: Vec<ComponentHealth>,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let status_code = match self.status {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status_code, Json(self)).into_response()
    }
}

/// Inspect the shared state without touching any payload.
pub fn check_health(ctx: &AppContext) -> HealthResponse {
    let sources = ctx.gate.allowlist().len();

    let dispatcher = if ctx.dispatcher.is_closed() {
        ComponentHealth {
            name: "dispatcher".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some("Dispatch worker has stopped".to_string()),
        }
    } else if ctx.dispatcher.remaining_capacity() == 0 {
        ComponentHealth {
            name: "dispatcher".to_string(),
            status: HealthStatus::Degraded,
            message: Some("Dispatch queue is full".to_string()),
        }
    } else {
        ComponentHealth {
            name: "dispatcher".to_string(),
            status: HealthStatus::Healthy,
            message: None,
        }
    };

    let checks = vec![
        ComponentHealth {
            name: "gate".to_string(),
            status: HealthStatus::Healthy,
            message: Some(format!(
                "{} trusted source(s), {}s replay window",
                sources,
                ctx.gate.replay_tolerance().as_secs()
            )),
        },
        dispatcher,
    ];

    let status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    HealthResponse { status, checks }
}

/// Handler for the health endpoint
pub async fn health_handler(State(ctx): State<AppContext>) -> HealthResponse {
    check_health(&ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::webhooks::{Dispatcher, LoggingHandler};
    use std::sync::Arc;

    fn context() -> (AppContext, tokio::task::JoinHandle<()>) {
        let config = ConfigBuilder::new().with_secret_key("secret").build().unwrap();
        let (dispatcher, worker) = Dispatcher::spawn(Arc::new(LoggingHandler), 4);
        (AppContext::from_config(&config.webhook, dispatcher).unwrap(), worker)
    }

    #[tokio::test]
    async fn test_healthy() {
        let (ctx, _worker) = context();
        let report = check_health(&ctx);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.checks.len(), 2);
        assert!(report.checks[0].message.as_deref().unwrap().contains("2 trusted source(s)"));
    }

    #[tokio::test]
    async fn test_stopped_dispatcher_is_unhealthy() {
        let (ctx, worker) = context();
        worker.abort();
        let _ = worker.await;

        let report = check_health(&ctx);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
