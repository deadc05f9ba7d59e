//! # Checkout Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository, catalog and invoicing adapters
//! - Create the payment intent service and webhook reconciler
//! - Start the confirmation worker and the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_hex::inbound::{AppState, HttpServer};
use checkout_hex::{PaymentIntentService, ServiceResolver, WebhookReconciler};
use checkout_repo::{ConfirmationWorker, FileCatalog, HttpIdentityProvider, HttpNotifier, build_repo};
use checkout_types::IdentityProvider;
use exchange_rates::{Converter, FixedRates};
use invoicing_client::{InvoicingClient, InvoicingConfig};

fn init_tracer() -> (sdktrace::Tracer, sdktrace::SdkTracerProvider) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .expect("failed to create OTLP span exporter");

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    (provider.tracer("checkout-service"), provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing
    let (otel_tracer, otel_provider) = init_tracer();
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,checkout_app=debug,checkout_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting checkout server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // Build repository (handles connection and migration)
    let repo = Arc::new(build_repo(&config.database_url).await?);

    // Catalog snapshot and the resolver cache over it
    let catalog = Arc::new(FileCatalog::load(&config.catalog_path).await?);
    tracing::info!("Loaded {} catalog services from {}", catalog.len(), config.catalog_path);
    let resolver = Arc::new(ServiceResolver::new(catalog));

    // Collaborators
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(HttpIdentityProvider::new(config.identity_url.clone()));
    let gateway = Arc::new(InvoicingClient::new(InvoicingConfig {
        base_url: config.invoicing_base_url.clone(),
        client_id: config.invoicing_client_id.clone(),
        client_secret: config.invoicing_client_secret.clone(),
        refresh_token: config.invoicing_refresh_token.clone(),
    }));
    let converter = Converter::new(Arc::new(FixedRates::new()));

    // Application services
    let service = PaymentIntentService::new(
        repo.clone(),
        gateway.clone(),
        resolver.clone(),
        identity.clone(),
        converter,
    );
    let reconciler = WebhookReconciler::new(
        repo.clone(),
        gateway.clone(),
        identity.clone(),
        resolver.clone(),
    );

    // Confirmation outbox worker
    if let Some(notification_url) = config.notification_url.clone() {
        let worker = ConfirmationWorker::new(repo.clone(), HttpNotifier::new(notification_url));
        tokio::spawn(worker.run());
    } else {
        tracing::warn!("NOTIFICATION_URL not set, payment confirmations stay queued");
    }

    // Create and run the HTTP server
    let server = HttpServer::new(AppState {
        service,
        reconciler,
        identity,
        gateway,
        webhook_secret: config.webhook_secret.clone(),
    });
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    let _ = otel_provider.shutdown();
    Ok(())
}
