use crate::{
    app::AppContext,
    config::Config,
    error::{Result, WebhookError},
    http::{RouteModule, WebhookModule},
    middleware::apply_middleware,
    webhooks::{Dispatcher, LoggingHandler, WebhookHandler},
};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;

/// How long to wait for queued webhooks after the listener closes
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The webhook service: routes, shared state, and the dispatch worker
pub struct App {
    router: Router<AppContext>,
    config: Config,
    context: AppContext,
    worker: JoinHandle<()>,
}

impl App {
    /// Creates an App that logs accepted webhooks.
    ///
    /// Spawns the dispatch worker, so this must run inside a Tokio runtime.
    pub fn with_config(config: Config) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    /// Builder pattern for constructing an App
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Get the router for testing purposes
    ///
    /// The middleware stack is applied and the context attached. The
    /// dispatch worker keeps running detached.
    pub fn into_test_router(self) -> Router {
        apply_middleware(self.router, &self.config.server).with_state(self.context)
    }

    /// Start the application server
    ///
    /// Returns after a shutdown signal, once in-flight requests finish and
    /// the dispatch queue drains (bounded by a timeout).
    pub async fn serve(self) -> Result<()> {
        let addr = self
            .config
            .server
            .addr()
            .map_err(|e| WebhookError::config(format!("Invalid server address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebhookError::internal(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!("Server starting on http://{}", addr);
        tracing::info!(
            trusted_sources = self.context.gate.allowlist().len(),
            replay_tolerance_secs = self.context.gate.replay_tolerance().as_secs(),
            signing_endpoint = self.config.webhook.signing_endpoint_enabled,
            "Webhook receiver available at http://{}/webhook",
            addr
        );

        // Router<AppContext> is a router still missing its state; only
        // Router<()> can be served.
        let router = apply_middleware(self.router, &self.config.server).with_state(self.context);

        // Peer addresses feed the allowlist check.
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WebhookError::internal(format!("Server error: {}", e)))?;

        // The router held the last Dispatcher; the worker now drains and exits.
        match tokio::time::timeout(DRAIN_TIMEOUT, self.worker).await {
            Ok(Ok(())) => tracing::info!("Dispatch queue drained"),
            Ok(Err(e)) => tracing::error!(error = %e, "Dispatch worker failed"),
            Err(_) => tracing::warn!("Timed out draining dispatch queue"),
        }

        tracing::info!("Shutdown complete");
        Ok(())
    }
}

/// Builder for App with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppBuilder {
    config: Config,
    handler: Arc<dyn WebhookHandler>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            handler: Arc::new(LoggingHandler),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Downstream processing for accepted webhooks
    pub fn with_handler(mut self, handler: Arc<dyn WebhookHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Key the signer, start the dispatch worker, and register routes.
    ///
    /// Fails if the configuration has no usable secret key.
    pub fn build(self) -> Result<App> {
        let webhook = &self.config.webhook;

        // Validate the key before anything is spawned.
        webhook.secret_bytes()?;

        let (dispatcher, worker) =
            Dispatcher::spawn(self.handler, webhook.dispatch_queue_capacity);
        let context = AppContext::from_config(webhook, dispatcher)?;

        let router = WebhookModule::new(webhook.signing_endpoint_enabled)
            .register(Router::<AppContext>::new());

        Ok(App {
            router,
            config: self.config,
            context,
            worker,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    #[tokio::test]
    async fn test_build_requires_secret() {
        let err = App::with_config(Config::default()).err().unwrap();
        assert!(matches!(err, WebhookError::Config(_)));
    }

    #[tokio::test]
    async fn test_build_with_config() {
        let config = ConfigBuilder::new()
            .with_secret_key("secret")
            .with_dispatch_queue_capacity(8)
            .build()
            .unwrap();
        let app = App::with_config(config).unwrap();
        assert_eq!(app.config().webhook.dispatch_queue_capacity, 8);
        assert_eq!(app.context().dispatcher.remaining_capacity(), 8);
    }
}
