//! Webhook-driven settlement of provider payment events.
//!
//! Consumes asynchronous provider events, maps invoice status onto the
//! order state machine and records settlement artifacts. Every sub-step
//! after the status transition is independently best-effort: the provider
//! treats any non-2xx acknowledgement as "retry the webhook", so a failed
//! notification must never fail the response, and every write is keyed by
//! order/invoice id so redelivery cannot duplicate anything.

use std::sync::Arc;

use chrono::Utc;

use checkout_types::{
    CheckoutError, IdentityProvider, InvoicingGateway, Order, OrderId, OrderRepository,
    OrderStatus, PaymentConfirmation, Receipt, SettleOutcome, WebhookAck, WebhookEnvelope,
    WebhookEventData,
};

use crate::resolver::ServiceResolver;

pub const EVENT_PAYMENT_RECEIVED: &str = "invoice_payment_received";
pub const EVENT_STATUS_CHANGED: &str = "invoice_status_changed";

pub struct WebhookReconciler<R: OrderRepository, G: InvoicingGateway> {
    repo: Arc<R>,
    gateway: Arc<G>,
    identity: Arc<dyn IdentityProvider>,
    resolver: Arc<ServiceResolver>,
}

impl<R: OrderRepository, G: InvoicingGateway> WebhookReconciler<R, G> {
    pub fn new(
        repo: Arc<R>,
        gateway: Arc<G>,
        identity: Arc<dyn IdentityProvider>,
        resolver: Arc<ServiceResolver>,
    ) -> Self {
        Self {
            repo,
            gateway,
            identity,
            resolver,
        }
    }

    /// Processes one structurally valid provider event.
    ///
    /// Returns an error only for unrecoverable processing failures (the
    /// datastore being down); everything else acknowledges, including
    /// events for invoices this system has never seen.
    #[tracing::instrument(skip(self, envelope), fields(event_type = %envelope.event_type))]
    pub async fn handle(&self, envelope: WebhookEnvelope) -> Result<WebhookAck, CheckoutError> {
        match envelope.event_type.as_str() {
            EVENT_PAYMENT_RECEIVED => self.handle_payment_received(&envelope.data).await?,
            EVENT_STATUS_CHANGED => self.handle_status_changed(&envelope.data).await?,
            other => {
                tracing::debug!(event_type = other, "ignoring unhandled webhook event type");
            }
        }
        Ok(WebhookAck {
            success: true,
            event_type: envelope.event_type,
        })
    }

    async fn handle_payment_received(&self, data: &WebhookEventData) -> Result<(), CheckoutError> {
        // An unmatched invoice is not an error: it may belong to a purchase
        // whose linking step has not landed yet, or to another system.
        let Some(order) = self.repo.find_by_external_invoice(&data.invoice_id).await? else {
            tracing::warn!(invoice = %data.invoice_id, "payment webhook for unmatched invoice, acknowledged and ignored");
            return Ok(());
        };

        let outcome = self.repo.settle(&data.invoice_id, OrderStatus::Paid).await?;
        match outcome {
            SettleOutcome::Updated => {
                tracing::info!(order = %order.id, invoice = %data.invoice_id, "order settled as paid");
            }
            SettleOutcome::Unchanged => {
                tracing::debug!(order = %order.id, "repeat payment event, transition is a no-op");
            }
            SettleOutcome::NotFound => return Ok(()),
        }

        self.record_settlement(&order, &data.invoice_id, data.total, data.payment_date)
            .await;
        Ok(())
    }

    async fn handle_status_changed(&self, data: &WebhookEventData) -> Result<(), CheckoutError> {
        let next = OrderStatus::from_provider_status(data.status.as_deref().unwrap_or(""));

        match self.repo.settle(&data.invoice_id, next).await? {
            SettleOutcome::NotFound => {
                tracing::warn!(invoice = %data.invoice_id, "status webhook for unmatched invoice, acknowledged and ignored");
            }
            outcome => {
                tracing::debug!(invoice = %data.invoice_id, status = %next, ?outcome, "status event applied");
            }
        }
        Ok(())
    }

    /// Manual reconciliation: polls the provider for the invoice status and
    /// applies the same settlement path as the webhook.
    pub async fn reconcile_order(&self, id: OrderId) -> Result<OrderStatus, CheckoutError> {
        let order = self
            .repo
            .get_order(id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(id))?;
        let Some(invoice_id) = order.external_invoice_id.clone() else {
            return Err(CheckoutError::Internal(
                "order has no linked invoice to reconcile against".into(),
            ));
        };

        let snapshot = self.gateway.invoice_status(&invoice_id).await?;
        let next = OrderStatus::from_provider_status(&snapshot.status);

        self.repo.settle(&invoice_id, next).await?;
        if next == OrderStatus::Paid {
            self.record_settlement(&order, &invoice_id, Some(snapshot.total), snapshot.payment_date)
                .await;
        }

        Ok(self
            .repo
            .get_order(id)
            .await?
            .map(|o| o.status)
            .unwrap_or(next))
    }

    /// Best-effort settlement artifacts: durable receipt plus one queued
    /// client confirmation. Both writes are keyed by the order id, so this
    /// is safe to call on every delivery of the same event.
    async fn record_settlement(
        &self,
        order: &Order,
        invoice_id: &str,
        total: Option<i64>,
        payment_date: Option<chrono::DateTime<Utc>>,
    ) {
        let amount = total.filter(|&t| t > 0).unwrap_or_else(|| order.total());
        let paid_at = payment_date.unwrap_or_else(Utc::now);

        let receipt = Receipt::new(order.id, invoice_id, amount, order.currency, paid_at);
        match self.repo.create_receipt(&receipt).await {
            Ok(true) => tracing::info!(order = %order.id, "receipt created"),
            Ok(false) => tracing::debug!(order = %order.id, "receipt already exists"),
            Err(e) => tracing::error!(order = %order.id, error = %e, "failed to create receipt"),
        }

        self.enqueue_confirmation(order).await;
    }

    async fn enqueue_confirmation(&self, order: &Order) {
        let profile = match self.identity.client_profile(order.client_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(client = %order.client_id, "no profile for settled order, skipping confirmation");
                return;
            }
            Err(e) => {
                tracing::warn!(client = %order.client_id, error = %e, "profile lookup failed, skipping confirmation");
                return;
            }
        };

        let service_name = self
            .resolver
            .service_name(order.service_id)
            .await
            .unwrap_or_else(|| order.service_id.to_string());

        let confirmation = PaymentConfirmation {
            client_name: profile.name,
            client_email: profile.email,
            service_name,
            package: order.package,
            order_id: order.id,
            amount: order.total(),
            currency: order.currency,
        };

        match self.repo.enqueue_confirmation(order.id, &confirmation).await {
            Ok(true) => tracing::info!(order = %order.id, "payment confirmation enqueued"),
            Ok(false) => tracing::debug!(order = %order.id, "confirmation already enqueued"),
            Err(e) => {
                tracing::error!(order = %order.id, error = %e, "failed to enqueue confirmation")
            }
        }
    }
}
