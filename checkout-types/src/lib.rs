//! # Checkout Types
//!
//! Domain types and port traits for the service checkout pipeline.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, ServiceCatalogEntry, Order)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AttemptOutcome, ClientId, ConfirmationJob, ConfirmationStatus, CurrencyAmounts,
    ExternalCustomer, ExternalInvoice, IntentId, InvoiceStatusSnapshot, Money, Order, OrderId,
    OrderStatus, PackageTier, PaymentAttempt, PaymentConfirmation, Receipt, ServiceCatalogEntry,
    ServiceId,
};
pub use dto::*;
pub use error::{CheckoutError, DomainError, ProviderError, RepoError};
pub use ports::{
    AuthUser, CatalogError, CatalogProvider, ClientProfile, CreateInvoiceRequest, IdentityError,
    IdentityProvider, InvoicingGateway, Notifier, NotifyError, OrderRepository, SettleOutcome,
};

// Currency support comes from the exchange-rates crate so the converter and
// the domain agree on one enum.
pub use exchange_rates::Currency;
