//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use checkout_types::{
    ApiFailure, AuthUser, CheckoutError, CreatePaymentIntentRequest, CustomerData, IdentityProvider,
    IntentId, InvoicingGateway, OrderId, OrderRepository, ProviderError, ServiceItem,
    WebhookEnvelope,
};
use exchange_rates::Currency;

use crate::reconcile::WebhookReconciler;
use crate::service::{IntentError, PaymentIntentService};

/// Application state shared across handlers.
pub struct AppState<R: OrderRepository, G: InvoicingGateway> {
    pub service: PaymentIntentService<R, G>,
    pub reconciler: WebhookReconciler<R, G>,
    pub identity: Arc<dyn IdentityProvider>,
    pub gateway: Arc<G>,
    /// Shared secret for provider webhook signatures; unsigned deliveries
    /// are accepted when unset.
    pub webhook_secret: Option<String>,
}

/// Wrapper to implement IntoResponse for CheckoutError (orphan rule
/// workaround), carrying the correlation token when one exists.
pub struct ApiError {
    error: CheckoutError,
    transaction_id: Option<IntentId>,
}

impl From<CheckoutError> for ApiError {
    fn from(error: CheckoutError) -> Self {
        ApiError {
            error,
            transaction_id: None,
        }
    }
}

impl From<IntentError> for ApiError {
    fn from(failure: IntentError) -> Self {
        ApiError {
            error: failure.error,
            transaction_id: Some(failure.intent_id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.error {
            CheckoutError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            CheckoutError::EmailNotVerified => StatusCode::FORBIDDEN,
            CheckoutError::ServiceNotFound(_)
            | CheckoutError::ProfileNotFound(_)
            | CheckoutError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            CheckoutError::InvalidPackage { .. } | CheckoutError::OrderValidationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            CheckoutError::Configuration(detail) => {
                tracing::error!(%detail, "provider configuration error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CheckoutError::Provider(ProviderError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
            CheckoutError::Provider(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiFailure::new(self.error.public_message(), self.transaction_id);
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Purchase entry point.
#[tracing::instrument(skip(state, user, req), fields(service = %req.service_identifier))]
pub async fn create_payment_intent<R: OrderRepository, G: InvoicingGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    user: Option<Extension<AuthUser>>,
    Json(req): Json<CreatePaymentIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = user.map(|Extension(user)| user);
    let response = state.service.create_payment_intent(user, req).await?;
    Ok(Json(response))
}

/// Order status read path.
#[tracing::instrument(skip(state, user), fields(order_id = %id))]
pub async fn get_order<R: OrderRepository, G: InvoicingGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    user: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| CheckoutError::OrderValidationFailed("Invalid order ID".into()))?;

    let user = user.map(|Extension(user)| user);
    let response = state.service.order_status(user, order_id).await?;
    Ok(Json(response))
}

/// Manual reconciliation: polls the provider and applies the webhook
/// settlement path.
#[tracing::instrument(skip(state, user), fields(order_id = %id))]
pub async fn reconcile_order<R: OrderRepository, G: InvoicingGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    user: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if user.is_none() {
        return Err(CheckoutError::AuthenticationRequired.into());
    }
    let order_id: OrderId = id
        .parse()
        .map_err(|_| CheckoutError::OrderValidationFailed("Invalid order ID".into()))?;

    let status = state.reconciler.reconcile_order(order_id).await?;
    Ok(Json(serde_json::json!({
        "orderId": order_id,
        "status": status,
    })))
}

/// Provider-initiated webhook receiver.
///
/// Responds 200 once the event is structurally valid, even if downstream
/// best-effort steps fail; a non-2xx would make the provider redeliver.
#[tracing::instrument(skip_all)]
pub async fn invoicing_webhook<R: OrderRepository, G: InvoicingGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get("X-Webhook-Signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !checkout_repo::security::verify_signature(&body, signature, secret) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiFailure::new("Invalid webhook signature", None)),
            )
                .into_response();
        }
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiFailure::new(format!("Malformed webhook payload: {}", e), None)),
            )
                .into_response();
        }
    };

    match state.reconciler.handle(envelope).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(error) => ApiError::from(error).into_response(),
    }
}

/// Provider connectivity/configuration test.
#[tracing::instrument(skip(state))]
pub async fn invoicing_ping<R: OrderRepository, G: InvoicingGateway>(
    State(state): State<Arc<AppState<R, G>>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .gateway
        .ping()
        .await
        .map_err(CheckoutError::from)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Request body of the end-to-end invoicing integration test.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoicingTestRequest {
    pub customer_data: CustomerData,
    pub service_items: Vec<ServiceItem>,
    pub currency: Currency,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Drives customer and invoice creation against the provider without
/// touching order state; used to verify integration configuration.
#[tracing::instrument(skip(state, req), fields(email = %req.customer_data.email))]
pub async fn invoicing_test<R: OrderRepository, G: InvoicingGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    user: Option<Extension<AuthUser>>,
    Json(req): Json<InvoicingTestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if user.is_none() {
        return Err(CheckoutError::AuthenticationRequired.into());
    }

    let customer = state
        .gateway
        .find_or_create_customer(&req.customer_data)
        .await
        .map_err(CheckoutError::from)?;

    let invoice = state
        .gateway
        .create_invoice(&checkout_types::CreateInvoiceRequest {
            customer_id: customer.id.clone(),
            items: req.service_items,
            currency: req.currency,
            notes: req.notes,
        })
        .await
        .map_err(CheckoutError::from)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "customer": customer,
        "invoice": invoice,
    })))
}
