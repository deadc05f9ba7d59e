//! Settlement-side records: provider references, receipts, audit entries
//! and the confirmation outbox.

use chrono::{DateTime, Utc};
use exchange_rates::Currency;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::{ClientId, IntentId, OrderId};
use super::service::PackageTier;

/// Customer record owned by the invoicing provider; only the opaque id and
/// the fields needed for reconciliation are held locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCustomer {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Invoice record owned by the invoicing provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalInvoice {
    pub id: String,
    /// Locally generated number, decoupled from provider numbering.
    pub number: String,
    pub total: i64,
    pub currency: Currency,
    pub due_date: DateTime<Utc>,
    pub payment_url: String,
}

/// Read-only status snapshot from the provider, used by manual
/// reconciliation paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceStatusSnapshot {
    pub status: String,
    pub total: i64,
    pub payment_date: Option<DateTime<Utc>>,
}

/// Durable settlement record; at most one per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub order_id: OrderId,
    pub external_invoice_id: String,
    pub amount: i64,
    pub currency: Currency,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    pub fn new(
        order_id: OrderId,
        external_invoice_id: impl Into<String>,
        amount: i64,
        currency: Currency,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            external_invoice_id: external_invoice_id.into(),
            amount,
            currency,
            paid_at,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one orchestration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Succeeded => "SUCCEEDED",
            AttemptOutcome::Failed => "FAILED",
        }
    }
}

/// Append-only audit entry for one purchase attempt.
///
/// Diagnosis only; business logic never reads these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub intent_id: IntentId,
    pub client_id: Option<ClientId>,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn succeeded(intent_id: IntentId, client_id: ClientId) -> Self {
        Self {
            id: Uuid::new_v4(),
            intent_id,
            client_id: Some(client_id),
            outcome: AttemptOutcome::Succeeded,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn failed(intent_id: IntentId, client_id: Option<ClientId>, error: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            intent_id,
            client_id,
            outcome: AttemptOutcome::Failed,
            error: Some(error),
            created_at: Utc::now(),
        }
    }
}

/// Payload handed to the notification collaborator after settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub client_name: String,
    pub client_email: String,
    pub service_name: String,
    pub package: PackageTier,
    pub order_id: OrderId,
    pub amount: i64,
    pub currency: Currency,
}

/// Delivery state of a queued confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConfirmationStatus {
    #[default]
    Pending,
    Delivered,
    Failed,
}

impl AsRef<str> for ConfirmationStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A queued client-facing confirmation, drained by the outbox worker.
///
/// Keyed by order id in storage, so repeat webhook deliveries enqueue at
/// most one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationJob {
    pub id: Uuid,
    pub order_id: OrderId,
    pub payload: PaymentConfirmation,
    pub status: ConfirmationStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_constructors() {
        let intent = IntentId::new();
        let client = ClientId::new();

        let ok = PaymentAttempt::succeeded(intent, client);
        assert_eq!(ok.outcome, AttemptOutcome::Succeeded);
        assert!(ok.error.is_none());

        let failed = PaymentAttempt::failed(intent, None, "service not found".into());
        assert_eq!(failed.outcome, AttemptOutcome::Failed);
        assert_eq!(failed.error.as_deref(), Some("service not found"));
    }

    #[test]
    fn test_receipt_carries_order_reference() {
        let order_id = OrderId::new();
        let receipt = Receipt::new(order_id, "inv_123", 1000, Currency::USD, Utc::now());
        assert_eq!(receipt.order_id, order_id);
        assert_eq!(receipt.external_invoice_id, "inv_123");
    }
}
