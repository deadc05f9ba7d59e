//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod catalog;
mod identity;
mod invoicing;
mod notify;
mod repository;

pub use catalog::{CatalogError, CatalogProvider};
pub use identity::{AuthUser, ClientProfile, IdentityError, IdentityProvider};
pub use invoicing::{CreateInvoiceRequest, InvoicingGateway};
pub use notify::{Notifier, NotifyError};
pub use repository::{OrderRepository, SettleOutcome};
