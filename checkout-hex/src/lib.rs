//! # Checkout Hex
//!
//! Application service layer and HTTP adapter for the checkout service.
//!
//! ## Architecture
//!
//! - `service/` - Payment intent orchestrator (drives the purchase pipeline)
//! - `resolver/` - Service identifier resolution with a process-wide cache
//! - `reconcile/` - Webhook-driven settlement of provider payment events
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: OrderRepository` and
//! `G: InvoicingGateway`, allowing different adapters to be injected.

pub mod inbound;
mod openapi;
pub mod reconcile;
pub mod resolver;
pub mod retry;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use reconcile::WebhookReconciler;
pub use resolver::ServiceResolver;
pub use service::{IntentError, PaymentIntentService};
