//! Invoicing provider port.

use exchange_rates::Currency;

use crate::domain::{ExternalCustomer, ExternalInvoice, InvoiceStatusSnapshot};
use crate::dto::{CustomerData, ServiceItem};
use crate::error::ProviderError;

/// Invoice creation input.
#[derive(Debug, Clone)]
pub struct CreateInvoiceRequest {
    pub customer_id: String,
    pub items: Vec<ServiceItem>,
    pub currency: Currency,
    pub notes: Option<String>,
}

/// Port to the external billing provider.
///
/// Implementations encapsulate every HTTP call to the provider, including
/// credential exchange, and surface failures pre-classified as
/// [`ProviderError`] so callers can decide retry eligibility.
#[async_trait::async_trait]
pub trait InvoicingGateway: Send + Sync + 'static {
    /// Creates the customer, or returns the existing record when the
    /// provider reports a duplicate.
    async fn find_or_create_customer(
        &self,
        data: &CustomerData,
    ) -> Result<ExternalCustomer, ProviderError>;

    async fn create_invoice(
        &self,
        request: &CreateInvoiceRequest,
    ) -> Result<ExternalInvoice, ProviderError>;

    /// Read-only status poll, used by manual reconciliation paths.
    async fn invoice_status(
        &self,
        invoice_id: &str,
    ) -> Result<InvoiceStatusSnapshot, ProviderError>;

    /// Connectivity/configuration test.
    async fn ping(&self) -> Result<(), ProviderError>;
}
