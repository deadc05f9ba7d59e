//! Payment intent orchestration.
//!
//! The top-level purchase use case: validates the requester, resolves the
//! service, derives per-currency amounts, persists a pending order, drives
//! the invoicing gateway and links provider references back onto the order.
//! Contains NO infrastructure logic - pure business orchestration over the
//! injected ports.

use std::sync::Arc;

use exchange_rates::{Converter, Currency};

use checkout_types::{
    AuthUser, CheckoutError, ClientId, CreateInvoiceRequest, CreatePaymentIntentRequest,
    CurrencyAmounts, CustomerData, IdentityProvider, IntentId, InvoicingGateway, Money, Order,
    OrderId, OrderRepository, OrderResponse, PaymentAttempt, PaymentIntentResponse, ServiceItem,
};

use crate::resolver::ServiceResolver;
use crate::retry::with_retry;

/// A failed purchase attempt, carrying the correlation token so the caller
/// can surface it alongside the normalized error.
#[derive(Debug)]
pub struct IntentError {
    pub intent_id: IntentId,
    pub error: CheckoutError,
}

/// Application service for the purchase pipeline.
///
/// Generic over the repository and gateway ports - adapters are injected at
/// compile time, which enables swapping them without code changes and
/// testing with in-memory implementations.
pub struct PaymentIntentService<R: OrderRepository, G: InvoicingGateway> {
    repo: Arc<R>,
    gateway: Arc<G>,
    resolver: Arc<ServiceResolver>,
    identity: Arc<dyn IdentityProvider>,
    converter: Converter,
}

impl<R: OrderRepository, G: InvoicingGateway> PaymentIntentService<R, G> {
    pub fn new(
        repo: Arc<R>,
        gateway: Arc<G>,
        resolver: Arc<ServiceResolver>,
        identity: Arc<dyn IdentityProvider>,
        converter: Converter,
    ) -> Self {
        Self {
            repo,
            gateway,
            resolver,
            identity,
            converter,
        }
    }

    /// Creates a payment intent: one pending order plus one provider
    /// invoice, returned with the payment link.
    ///
    /// Every attempt gets a correlation token; success and failure are both
    /// recorded in the append-only audit log. Any step failure aborts the
    /// whole intent.
    pub async fn create_payment_intent(
        &self,
        user: Option<AuthUser>,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntentResponse, IntentError> {
        let intent_id = IntentId::new();
        let client_id = user.as_ref().map(|u| u.id);

        match self.run_intent(intent_id, user, &request).await {
            Ok((client_id, response)) => {
                if let Err(e) = self
                    .repo
                    .record_attempt(&PaymentAttempt::succeeded(intent_id, client_id))
                    .await
                {
                    tracing::error!(intent = %intent_id, error = %e, "failed to record successful attempt");
                }
                Ok(response)
            }
            Err(error) => {
                tracing::warn!(intent = %intent_id, error = %error, "payment intent failed");
                let attempt = PaymentAttempt::failed(intent_id, client_id, error.to_string());
                if let Err(e) = self.repo.record_attempt(&attempt).await {
                    tracing::error!(intent = %intent_id, error = %e, "failed to record failed attempt");
                }
                Err(IntentError { intent_id, error })
            }
        }
    }

    async fn run_intent(
        &self,
        intent_id: IntentId,
        user: Option<AuthUser>,
        request: &CreatePaymentIntentRequest,
    ) -> Result<(ClientId, PaymentIntentResponse), CheckoutError> {
        // Step 1: requester identity and verification state.
        let user = user.ok_or(CheckoutError::AuthenticationRequired)?;
        if !user.is_verified() {
            return Err(CheckoutError::EmailNotVerified);
        }

        // Step 2: resolve the service (canonical id or legacy slug).
        let service = self.resolver.resolve(&request.service_identifier).await?;

        // Step 3: the requested tier must be priced for this service.
        let unit_price_usd = service
            .price_for(request.package_type)
            .filter(|&price| price > 0)
            .ok_or_else(|| CheckoutError::InvalidPackage {
                package: request.package_type.to_string(),
            })?;

        // Step 4: billing profile.
        let profile = self
            .identity
            .client_profile(user.id)
            .await
            .map_err(|e| CheckoutError::Internal(e.to_string()))?
            .ok_or(CheckoutError::ProfileNotFound(user.id))?;

        // Step 5: derive the two non-chosen currency amounts. The caller's
        // total is authoritative for the chosen currency and never
        // re-derived.
        let total = Money::new(request.total_price, request.currency)?;
        let amounts = CurrencyAmounts::derive(total.amount(), total.currency(), &self.converter)?;

        // Step 6: persist the pending order. The persistence boundary is
        // the authoritative last-line invariant check; a violation here is
        // never retried.
        let order = Order::new(
            user.id,
            service.id,
            request.package_type,
            request.quantity,
            amounts,
            request.currency,
        )?;
        self.repo.create_order(&order).await?;

        // Step 7: customer and invoice against the provider. Transient
        // failures retry with backoff; configuration and permanent errors
        // abort immediately.
        let customer_data = CustomerData {
            name: profile.name,
            email: profile.email,
            phone: profile.phone,
            company: profile.company,
        };
        let customer = with_retry("find_or_create_customer", || {
            self.gateway.find_or_create_customer(&customer_data)
        })
        .await?;

        let unit_price = self
            .converter
            .convert(unit_price_usd, Currency::USD, request.currency);
        let invoice_request = CreateInvoiceRequest {
            customer_id: customer.id.clone(),
            items: vec![ServiceItem {
                name: service.name.clone(),
                description: format!(
                    "{} package, quantity {}",
                    request.package_type, request.quantity
                ),
                unit_price,
                quantity: request.quantity,
            }],
            currency: request.currency,
            notes: Some(format!("Order {} - {}", order.id, service.name)),
        };
        let invoice = with_retry("create_invoice", || {
            self.gateway.create_invoice(&invoice_request)
        })
        .await?;

        // Step 8: best-effort linking. The invoice and order both exist at
        // this point; a failed update leaves the order pending and is
        // repaired by reconciliation, never rolled back.
        if let Err(e) = self
            .repo
            .link_external_refs(order.id, &invoice.id, &customer.id)
            .await
        {
            tracing::warn!(
                order = %order.id,
                invoice = %invoice.id,
                error = %e,
                "failed to link provider references onto order"
            );
        }

        Ok((
            user.id,
            PaymentIntentResponse {
                invoice_id: invoice.id,
                invoice_number: invoice.number,
                payment_url: invoice.payment_url,
                total: order.total(),
                status: order.status,
                customer_id: customer.id,
                transaction_id: intent_id,
            },
        ))
    }

    /// Order read path for the owning client.
    pub async fn order_status(
        &self,
        user: Option<AuthUser>,
        id: OrderId,
    ) -> Result<OrderResponse, CheckoutError> {
        let user = user.ok_or(CheckoutError::AuthenticationRequired)?;
        let order = self
            .repo
            .get_order(id)
            .await?
            .filter(|order| order.client_id == user.id)
            .ok_or(CheckoutError::OrderNotFound(id))?;

        Ok(OrderResponse {
            order_id: order.id,
            status: order.status,
            package: order.package,
            quantity: order.quantity,
            amounts: order.amounts,
            currency: order.currency,
            external_invoice_id: order.external_invoice_id,
            created_at: order.created_at,
        })
    }
}
