//! Domain models for the checkout service.

pub mod money;
pub mod order;
pub mod service;
pub mod settlement;

pub use money::{CurrencyAmounts, Money};
pub use order::{ClientId, IntentId, Order, OrderId, OrderStatus};
pub use service::{PackageTier, ServiceCatalogEntry, ServiceId};
pub use settlement::{
    AttemptOutcome, ConfirmationJob, ConfirmationStatus, ExternalCustomer, ExternalInvoice,
    InvoiceStatusSnapshot, PaymentAttempt, PaymentConfirmation, Receipt,
};
