//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use checkout_types::domain::{CurrencyAmounts, IntentId, OrderId, OrderStatus, PackageTier, ServiceId};
use checkout_types::dto::{
    ApiFailure, CreatePaymentIntentRequest, CustomerData, OrderResponse, PaymentIntentResponse,
    ServiceItem, WebhookAck, WebhookEnvelope, WebhookEventData,
};
use exchange_rates::Currency;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

use crate::inbound::handlers::InvoicingTestRequest;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Create a payment intent for a catalog service
#[utoipa::path(
    post,
    path = "/api/payments/intent",
    tag = "payments",
    request_body = CreatePaymentIntentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending order created with a provider invoice", body = PaymentIntentResponse),
        (status = 400, description = "Invalid package or order validation failure", body = ApiFailure),
        (status = 401, description = "Authentication required", body = ApiFailure),
        (status = 403, description = "Email not verified", body = ApiFailure),
        (status = 404, description = "Service or profile not found", body = ApiFailure),
        (status = 503, description = "Invoicing provider temporarily unavailable", body = ApiFailure)
    )
)]
async fn create_payment_intent() {}

/// Get an order's status
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Order ID (UUID)")
    ),
    responses(
        (status = 200, description = "Order details", body = OrderResponse),
        (status = 401, description = "Authentication required", body = ApiFailure),
        (status = 404, description = "Order not found", body = ApiFailure)
    )
)]
async fn get_order() {}

/// Manually reconcile an order against the provider
#[utoipa::path(
    post,
    path = "/api/orders/{id}/reconcile",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Order ID (UUID)")
    ),
    responses(
        (status = 200, description = "Current order status after reconciliation", body = inline(serde_json::Value)),
        (status = 401, description = "Authentication required", body = ApiFailure),
        (status = 404, description = "Order not found", body = ApiFailure)
    )
)]
async fn reconcile_order() {}

/// Invoicing provider webhook receiver
#[utoipa::path(
    post,
    path = "/api/webhooks/invoicing",
    tag = "webhooks",
    request_body = WebhookEnvelope,
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Malformed webhook payload", body = ApiFailure),
        (status = 401, description = "Invalid webhook signature", body = ApiFailure)
    )
)]
async fn invoicing_webhook() {}

/// Invoicing provider connectivity test
#[utoipa::path(
    get,
    path = "/api/invoicing/ping",
    tag = "invoicing",
    responses(
        (status = 200, description = "Provider reachable", body = inline(serde_json::Value), example = json!({"success": true})),
        (status = 502, description = "Provider rejected the request", body = ApiFailure)
    )
)]
async fn invoicing_ping() {}

/// End-to-end invoicing integration test
#[utoipa::path(
    post,
    path = "/api/invoicing/test",
    tag = "invoicing",
    request_body = InvoicingTestRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Customer and invoice created", body = inline(serde_json::Value)),
        (status = 401, description = "Authentication required", body = ApiFailure),
        (status = 502, description = "Provider rejected the request", body = ApiFailure)
    )
)]
async fn invoicing_test() {}

/// OpenAPI documentation for the Checkout API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Checkout Service API",
        version = "1.0.0",
        description = "Purchase catalog services and pay through the external invoicing provider.\n\n## Authentication\n\nMost endpoints require Bearer token authentication issued by the identity service:\n\n```\nAuthorization: Bearer <token>\n```\n\nWebhook deliveries authenticate with an HMAC signature instead.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_payment_intent,
        get_order,
        reconcile_order,
        invoicing_webhook,
        invoicing_ping,
        invoicing_test,
    ),
    components(
        schemas(
            CreatePaymentIntentRequest,
            PaymentIntentResponse,
            ApiFailure,
            OrderResponse,
            WebhookEnvelope,
            WebhookEventData,
            WebhookAck,
            CustomerData,
            ServiceItem,
            InvoicingTestRequest,
            Currency,
            PackageTier,
            OrderStatus,
            CurrencyAmounts,
            OrderId,
            ServiceId,
            IntentId,
        )
    ),

    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "payments", description = "Purchase pipeline"),
        (name = "orders", description = "Order status and reconciliation"),
        (name = "webhooks", description = "Provider webhook reception"),
        (name = "invoicing", description = "Provider integration diagnostics"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
