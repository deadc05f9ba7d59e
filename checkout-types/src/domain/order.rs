//! Order domain model and its status state machine.

use chrono::{DateTime, Utc};
use exchange_rates::Currency;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::CurrencyAmounts;
use super::service::{PackageTier, ServiceId};
use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an Order.
    OrderId
}

uuid_id! {
    /// Identifier of the purchasing client (owned by the identity collaborator).
    ClientId
}

uuid_id! {
    /// Correlation token minted at the start of one purchase attempt.
    ///
    /// Ties together every audit-log entry produced by that attempt; it is
    /// process-local and never sent to the invoicing provider.
    IntentId
}

/// Order lifecycle status.
///
/// Transitions are monotonic: `Pending` may move to `Paid` or `Cancelled`,
/// both of which are terminal. Provider events that report `sent` or
/// `overdue` leave the order `Pending` and actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    /// Self-transitions are permitted no-ops.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Pending, _) => true,
            (current, next) => *current == next,
        }
    }

    /// Maps a provider-reported invoice status onto the order state machine.
    ///
    /// Unknown statuses map to `Pending`: an ambiguous event must never
    /// mark an order paid.
    pub fn from_provider_status(status: &str) -> OrderStatus {
        match status.to_lowercase().as_str() {
            "paid" => OrderStatus::Paid,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "sent" | "overdue" | "draft" => OrderStatus::Pending,
            other => {
                tracing::warn!(status = other, "unknown provider invoice status, treating as pending");
                OrderStatus::Pending
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl AsRef<str> for OrderStatus {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A purchase order.
///
/// Created `Pending` by the orchestrator before any provider call, linked
/// to the external invoice/customer afterwards, and settled by webhook
/// reconciliation. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: ClientId,
    /// Always the canonical service id, never a legacy slug.
    pub service_id: ServiceId,
    pub package: PackageTier,
    pub quantity: u32,
    pub amounts: CurrencyAmounts,
    /// The currency the client chose to pay in.
    pub currency: Currency,
    pub status: OrderStatus,
    pub external_invoice_id: Option<String>,
    pub external_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new pending order.
    pub fn new(
        client_id: ClientId,
        service_id: ServiceId,
        package: PackageTier,
        quantity: u32,
        amounts: CurrencyAmounts,
        currency: Currency,
    ) -> Result<Self, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            client_id,
            service_id,
            package,
            quantity,
            amounts,
            currency,
            status: OrderStatus::Pending,
            external_invoice_id: None,
            external_customer_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// The amount owed in the client's chosen currency.
    pub fn total(&self) -> i64 {
        self.amounts.get(self.currency)
    }

    /// Reconstructs an order from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        client_id: ClientId,
        service_id: ServiceId,
        package: PackageTier,
        quantity: u32,
        amounts: CurrencyAmounts,
        currency: Currency,
        status: OrderStatus,
        external_invoice_id: Option<String>,
        external_customer_id: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            service_id,
            package,
            quantity,
            amounts,
            currency,
            status,
            external_invoice_id,
            external_customer_id,
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts() -> CurrencyAmounts {
        CurrencyAmounts::new(1000, 920, 83_125).unwrap()
    }

    #[test]
    fn test_new_order_is_pending_and_unlinked() {
        let order = Order::new(
            ClientId::new(),
            ServiceId::new(),
            PackageTier::Standard,
            1,
            amounts(),
            Currency::USD,
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.external_invoice_id.is_none());
        assert_eq!(order.total(), 1000);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = Order::new(
            ClientId::new(),
            ServiceId::new(),
            PackageTier::Basic,
            0,
            amounts(),
            Currency::EUR,
        );
        assert!(matches!(result, Err(DomainError::InvalidQuantity(0))));
    }

    #[test]
    fn test_pending_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_states_absorb() {
        for terminal in [OrderStatus::Paid, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(OrderStatus::Pending));
            assert!(terminal.can_transition_to(terminal));
        }
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_provider_status_mapping() {
        assert_eq!(
            OrderStatus::from_provider_status("paid"),
            OrderStatus::Paid
        );
        assert_eq!(
            OrderStatus::from_provider_status("Cancelled"),
            OrderStatus::Cancelled
        );
        assert_eq!(
            OrderStatus::from_provider_status("sent"),
            OrderStatus::Pending
        );
        assert_eq!(
            OrderStatus::from_provider_status("overdue"),
            OrderStatus::Pending
        );
        // Fail-safe: ambiguous events never settle an order.
        assert_eq!(
            OrderStatus::from_provider_status("mystery"),
            OrderStatus::Pending
        );
    }
}
