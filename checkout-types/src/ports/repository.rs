//! Order repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, InMemory) will implement this trait.

use uuid::Uuid;

use crate::domain::{
    ConfirmationJob, Order, OrderId, OrderStatus, PaymentAttempt, PaymentConfirmation, Receipt,
};
use crate::error::RepoError;

/// Result of a settlement compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The order moved to the requested status.
    Updated,
    /// No-op: the order was already in the requested status, or the
    /// requested transition is not permitted from its current status.
    Unchanged,
    /// No order carries this external invoice id.
    NotFound,
}

/// The main repository port for order persistence.
///
/// Status transitions MUST serialize at the datastore: `settle` is a
/// single-row compare-and-set keyed by external invoice id, so concurrent
/// webhook deliveries cannot violate the terminal-state invariant.
#[async_trait::async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Order Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a new pending order. The persistence boundary re-validates
    /// package tier, positive amounts and quantity as the authoritative
    /// last-line check; violations surface as `RepoError::Validation`.
    async fn create_order(&self, order: &Order) -> Result<(), RepoError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepoError>;

    /// Links provider references back onto the order. Callers treat this
    /// as best-effort: a failure here leaves the order pending and is
    /// repaired by reconciliation.
    async fn link_external_refs(
        &self,
        id: OrderId,
        invoice_id: &str,
        customer_id: &str,
    ) -> Result<(), RepoError>;

    async fn find_by_external_invoice(
        &self,
        invoice_id: &str,
    ) -> Result<Option<Order>, RepoError>;

    /// Compare-and-set status transition keyed by external invoice id.
    async fn settle(
        &self,
        invoice_id: &str,
        next: OrderStatus,
    ) -> Result<SettleOutcome, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Settlement records (idempotent keyed by order)
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts the receipt unless one already exists for the order.
    /// Returns `true` only when a new row was created.
    async fn create_receipt(&self, receipt: &Receipt) -> Result<bool, RepoError>;

    /// Enqueues a client-facing confirmation unless one is already queued
    /// for the order. Returns `true` only when a new row was created.
    async fn enqueue_confirmation(
        &self,
        order_id: OrderId,
        payload: &PaymentConfirmation,
    ) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Audit & outbox
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends an orchestration attempt to the audit log.
    async fn record_attempt(&self, attempt: &PaymentAttempt) -> Result<(), RepoError>;

    /// Pending confirmations for the outbox worker, oldest first.
    async fn pending_confirmations(
        &self,
        limit: i64,
    ) -> Result<Vec<ConfirmationJob>, RepoError>;

    /// Marks a confirmation delivered or failed, bumping the attempt count.
    async fn mark_confirmation(
        &self,
        id: Uuid,
        delivered: bool,
        last_error: Option<String>,
    ) -> Result<(), RepoError>;
}
