//! Notification collaborator port.

use crate::domain::PaymentConfirmation;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Client-facing notification dispatch. Call sites treat delivery as
/// fire-and-forget: a failure is logged, never propagated into the
/// settlement path.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_payment_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<(), NotifyError>;
}
