//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use checkout_types::{
    ClientId, ConfirmationJob, ConfirmationStatus, CurrencyAmounts, Order, OrderId, OrderStatus,
    PackageTier, RepoError, ServiceId,
};
use exchange_rates::Currency;

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Order row from database.
#[derive(FromRow)]
pub struct DbOrder {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub client_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub client_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub service_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub service_id: String,

    pub package_type: String,
    pub quantity: i64,
    pub amount_usd: i64,
    pub amount_eur: i64,
    pub amount_inr: i64,
    pub currency: String,
    pub status: String,
    pub external_invoice_id: Option<String>,
    pub external_customer_id: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub updated_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub updated_at: String,
}

/// Confirmation outbox row from database.
#[derive(FromRow)]
pub struct DbConfirmation {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub order_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub order_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub payload: serde_json::Value,
    #[cfg(feature = "sqlite")]
    pub payload: String,

    pub status: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub processed_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub processed_at: Option<String>,

    pub attempts: i32,
    pub last_error: Option<String>,
}

/// Status-only row for settlement lookups.
#[derive(FromRow)]
pub struct DbOrderStatus {
    pub status: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown currency: {}", s)))
}

pub fn parse_tier(s: &str) -> Result<PackageTier, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown package tier: {}", s)))
}

pub fn parse_status(s: &str) -> Result<OrderStatus, RepoError> {
    match s {
        "PENDING" => Ok(OrderStatus::Pending),
        "PAID" => Ok(OrderStatus::Paid),
        "CANCELLED" => Ok(OrderStatus::Cancelled),
        _ => Err(RepoError::Database(format!("Unknown order status: {}", s))),
    }
}

#[cfg(feature = "sqlite")]
fn parse_datetime(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbOrder {
    /// Convert database row to domain Order.
    pub fn into_domain(self) -> Result<Order, RepoError> {
        let package = parse_tier(&self.package_type)?;
        let currency = parse_currency(&self.currency)?;
        let status = parse_status(&self.status)?;
        let amounts = CurrencyAmounts::new(self.amount_usd, self.amount_eur, self.amount_inr)
            .map_err(RepoError::Domain)?;
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| RepoError::Database(format!("Bad quantity: {}", self.quantity)))?;

        #[cfg(not(feature = "sqlite"))]
        let (id, client_id, service_id, created_at, updated_at) = (
            OrderId::from_uuid(self.id),
            ClientId::from_uuid(self.client_id),
            ServiceId::from_uuid(self.service_id),
            self.created_at,
            self.updated_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, client_id, service_id, created_at, updated_at) = {
            let id = uuid::Uuid::parse_str(&self.id)
                .map_err(|e| RepoError::Database(e.to_string()))?;
            let client = uuid::Uuid::parse_str(&self.client_id)
                .map_err(|e| RepoError::Database(e.to_string()))?;
            let service = uuid::Uuid::parse_str(&self.service_id)
                .map_err(|e| RepoError::Database(e.to_string()))?;
            (
                OrderId::from_uuid(id),
                ClientId::from_uuid(client),
                ServiceId::from_uuid(service),
                parse_datetime(&self.created_at)?,
                parse_datetime(&self.updated_at)?,
            )
        };

        Ok(Order::from_parts(
            id,
            client_id,
            service_id,
            package,
            quantity,
            amounts,
            currency,
            status,
            self.external_invoice_id,
            self.external_customer_id,
            created_at,
            updated_at,
        ))
    }
}

impl DbConfirmation {
    /// Convert database row to a domain ConfirmationJob.
    pub fn into_domain(self) -> Result<ConfirmationJob, RepoError> {
        let status = match self.status.as_str() {
            "DELIVERED" => ConfirmationStatus::Delivered,
            "FAILED" => ConfirmationStatus::Failed,
            _ => ConfirmationStatus::Pending,
        };

        #[cfg(not(feature = "sqlite"))]
        let (id, order_id, payload, created_at, processed_at) = (
            self.id,
            OrderId::from_uuid(self.order_id),
            serde_json::from_value(self.payload)
                .map_err(|e| RepoError::Database(e.to_string()))?,
            self.created_at,
            self.processed_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, order_id, payload, created_at, processed_at) = {
            let id = uuid::Uuid::parse_str(&self.id)
                .map_err(|e| RepoError::Database(e.to_string()))?;
            let order = uuid::Uuid::parse_str(&self.order_id)
                .map_err(|e| RepoError::Database(e.to_string()))?;
            let payload = serde_json::from_str(&self.payload)
                .map_err(|e| RepoError::Database(e.to_string()))?;
            let processed_at = self.processed_at.as_deref().map(parse_datetime).transpose()?;
            (
                id,
                OrderId::from_uuid(order),
                payload,
                parse_datetime(&self.created_at)?,
                processed_at,
            )
        };

        Ok(ConfirmationJob {
            id,
            order_id,
            payload,
            status,
            created_at,
            processed_at,
            attempts: self.attempts,
            last_error: self.last_error,
        })
    }
}
