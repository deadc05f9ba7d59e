//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! These are the explicit records at the HTTP boundary; payloads are
//! validated into them before any business logic runs.

use chrono::{DateTime, Utc};
use exchange_rates::Currency;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CurrencyAmounts, IntentId, OrderId, OrderStatus, PackageTier};

// ─────────────────────────────────────────────────────────────────────────────
// Purchase DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request body of the purchase entry point.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    /// Canonical service id or legacy slug (e.g. "ssl-setup").
    #[schema(example = "ssl-setup")]
    pub service_identifier: String,
    pub package_type: PackageTier,
    /// Total in minor units of `currency`; authoritative for that currency.
    #[schema(example = 1000)]
    pub total_price: i64,
    pub currency: Currency,
    #[schema(example = 1)]
    pub quantity: u32,
}

/// Successful purchase response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub invoice_id: String,
    pub invoice_number: String,
    pub payment_url: String,
    /// Amount owed in the chosen currency, minor units.
    pub total: i64,
    pub status: OrderStatus,
    pub customer_id: String,
    /// Correlation token for this purchase attempt.
    pub transaction_id: IntentId,
}

/// Error envelope returned for any failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiFailure {
    /// Always `false`.
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<IntentId>,
}

impl ApiFailure {
    pub fn new(error: impl Into<String>, transaction_id: Option<IntentId>) -> Self {
        Self {
            success: false,
            error: error.into(),
            transaction_id,
        }
    }
}

/// Order read-path response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub package: PackageTier,
    pub quantity: u32,
    pub amounts: CurrencyAmounts,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_invoice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoicing DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Customer fields sent to the invoicing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerData {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// One invoice line item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceItem {
    pub name: String,
    /// Includes package tier and quantity for the human-readable invoice.
    pub description: String,
    /// Unit price in minor units of the invoice currency.
    pub unit_price: i64,
    pub quantity: u32,
}

impl ServiceItem {
    pub fn total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Provider-initiated webhook envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookEnvelope {
    #[schema(example = "invoice_payment_received")]
    pub event_type: String,
    pub data: WebhookEventData,
}

/// Payload of a provider webhook event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookEventData {
    pub invoice_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
}

/// Webhook acknowledgement; returned with 200 once the event is
/// structurally valid, even if best-effort downstream steps failed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub event_type: String,
}
