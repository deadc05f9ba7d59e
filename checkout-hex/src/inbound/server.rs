//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use checkout_types::{InvoicingGateway, OrderRepository};

use super::auth::identity_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::openapi::ApiDoc;

/// HTTP Server for the Checkout API.
pub struct HttpServer<R: OrderRepository, G: InvoicingGateway> {
    state: Arc<AppState<R, G>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: OrderRepository, G: InvoicingGateway> HttpServer<R, G> {
    /// Creates a new HTTP server with the given application state.
    pub fn new(state: AppState<R, G>) -> Self {
        Self {
            state: Arc::new(state),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(state: AppState<R, G>, requests_per_minute: u32) -> Self {
        use std::time::Duration;
        Self {
            state: Arc::new(state),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        use utoipa::OpenApi as _;

        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/api/payments/intent",
                post(handlers::create_payment_intent::<R, G>),
            )
            .route("/api/orders/{id}", get(handlers::get_order::<R, G>))
            .route(
                "/api/orders/{id}/reconcile",
                post(handlers::reconcile_order::<R, G>),
            )
            .route(
                "/api/webhooks/invoicing",
                post(handlers::invoicing_webhook::<R, G>),
            )
            .route("/api/invoicing/ping", get(handlers::invoicing_ping::<R, G>))
            .route("/api/invoicing/test", post(handlers::invoicing_test::<R, G>))
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                identity_middleware::<R, G>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
