//! # Invoicing Client
//!
//! A typed Rust client for the external invoicing provider. Implements the
//! `InvoicingGateway` port: credential exchange, idempotent customer
//! creation, invoice creation and status polls. Every call carries a bounded
//! timeout and surfaces failures pre-classified as `ProviderError`, so
//! callers never inspect provider-specific error shapes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distr::{Alphanumeric, SampleString};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use checkout_types::{
    CreateInvoiceRequest, CustomerData, ExternalCustomer, ExternalInvoice, InvoiceStatusSnapshot,
    InvoicingGateway, ProviderError,
};

/// Bounded per-call network timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Invoices fall due a fixed 30 days after creation.
const DUE_DAYS: i64 = 30;

/// Slack subtracted from the provider-reported token lifetime so we refresh
/// before the token actually expires mid-call.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// Provider credentials and endpoints.
#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    /// Provider API base, e.g. `https://billing.example.com`.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Long-lived refresh credential exchanged for short-lived access tokens.
    pub refresh_token: String,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Invoicing provider API client.
pub struct InvoicingClient {
    config: InvoicingConfig,
    http: Client,
    token: Mutex<Option<CachedToken>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types (provider contract)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct CustomerEnvelope {
    customer: WireCustomer,
}

#[derive(Deserialize)]
struct CustomerListEnvelope {
    customers: Vec<WireCustomer>,
}

#[derive(Deserialize)]
struct WireCustomer {
    id: String,
    name: String,
    email: String,
}

#[derive(Deserialize)]
struct InvoiceEnvelope {
    invoice: WireInvoice,
}

#[derive(Deserialize)]
struct WireInvoice {
    id: String,
}

#[derive(Deserialize)]
struct InvoiceStatusEnvelope {
    invoice: WireInvoiceStatus,
}

#[derive(Deserialize)]
struct WireInvoiceStatus {
    status: String,
    total: i64,
    payment_date: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

impl InvoicingClient {
    pub fn new(mut config: InvoicingConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            config,
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            token: Mutex::new(None),
        }
    }

    /// Exchanges the refresh credential for a short-lived access token.
    ///
    /// 400/401 from the token endpoint mean misconfigured or expired
    /// credentials, not transient failure: they surface as a configuration
    /// error and are never retried.
    pub async fn get_access_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let resp = self
            .http
            .post(format!("{}/oauth/token", self.config.base_url))
            .json(&serde_json::json!({
                "grant_type": "refresh_token",
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "refresh_token": self.config.refresh_token,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Configuration(format!(
                "token endpoint rejected credentials with {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(classify_status(status, "token endpoint"));
        }

        let token: TokenResponse = resp.json().await.map_err(transport_error)?;
        let expires_at = Utc::now()
            + chrono::Duration::seconds(token.expires_in)
            - chrono::Duration::from_std(TOKEN_EXPIRY_SLACK).unwrap_or_default();

        let access_token = token.access_token.clone();
        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });
        Ok(access_token)
    }

    async fn find_customer_by_email(
        &self,
        token: &str,
        email: &str,
    ) -> Result<ExternalCustomer, ProviderError> {
        let resp = self
            .http
            .get(format!("{}/api/customers", self.config.base_url))
            .bearer_auth(token)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify_status(status, "customer lookup"));
        }

        let list: CustomerListEnvelope = resp.json().await.map_err(transport_error)?;
        list.customers
            .into_iter()
            .next()
            .map(into_customer)
            .ok_or_else(|| {
                ProviderError::Permanent(format!("no customer found for email {}", email))
            })
    }

    fn payment_url(&self, invoice_id: &str) -> String {
        format!("{}/pay/{}", self.config.base_url, invoice_id)
    }
}

fn into_customer(wire: WireCustomer) -> ExternalCustomer {
    ExternalCustomer {
        id: wire.id,
        name: wire.name,
        email: wire.email,
    }
}

/// Locally generated invoice number, decoupled from provider numbering
/// collisions.
fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), 6)
        .to_uppercase();
    format!("INV-{}-{}", now.format("%Y%m%d"), suffix)
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::Transient(err.to_string())
    } else {
        ProviderError::Permanent(err.to_string())
    }
}

/// Maps a non-success HTTP status onto the error taxonomy.
fn classify_status(status: StatusCode, context: &str) -> ProviderError {
    if status.is_server_error() {
        ProviderError::Transient(format!("{}: HTTP {}", context, status))
    } else if status == StatusCode::CONFLICT {
        ProviderError::DuplicateResource(format!("{}: HTTP {}", context, status))
    } else {
        ProviderError::Permanent(format!("{}: HTTP {}", context, status))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InvoicingGateway implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl InvoicingGateway for InvoicingClient {
    /// Create-then-find-on-conflict: creation is attempted first (the common
    /// case is a new customer), and a duplicate-resource response falls back
    /// to a lookup by email, keeping the call idempotent for repeat buyers.
    async fn find_or_create_customer(
        &self,
        data: &CustomerData,
    ) -> Result<ExternalCustomer, ProviderError> {
        let token = self.get_access_token().await?;

        let resp = self
            .http
            .post(format!("{}/api/customers", self.config.base_url))
            .bearer_auth(&token)
            .json(data)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_success() {
            let envelope: CustomerEnvelope = resp.json().await.map_err(transport_error)?;
            return Ok(into_customer(envelope.customer));
        }

        match classify_status(status, "customer creation") {
            ProviderError::DuplicateResource(_) => {
                tracing::debug!(email = %data.email, "customer exists, falling back to lookup");
                self.find_customer_by_email(&token, &data.email).await
            }
            other => Err(other),
        }
    }

    async fn create_invoice(
        &self,
        request: &CreateInvoiceRequest,
    ) -> Result<ExternalInvoice, ProviderError> {
        let token = self.get_access_token().await?;

        let now = Utc::now();
        let number = generate_invoice_number(now);
        let due_date = now + chrono::Duration::days(DUE_DAYS);
        let total: i64 = request.items.iter().map(|item| item.total()).sum();

        let line_items: Vec<serde_json::Value> = request
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "name": item.name,
                    "description": item.description,
                    "unit_price": item.unit_price,
                    "quantity": item.quantity,
                    "total": item.total(),
                })
            })
            .collect();

        let resp = self
            .http
            .post(format!("{}/api/invoices", self.config.base_url))
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "customer_id": request.customer_id,
                "invoice_number": number,
                "currency": request.currency.code(),
                "line_items": line_items,
                "notes": request.notes,
                "due_date": due_date,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify_status(status, "invoice creation"));
        }

        let envelope: InvoiceEnvelope = resp.json().await.map_err(transport_error)?;
        let payment_url = self.payment_url(&envelope.invoice.id);

        Ok(ExternalInvoice {
            id: envelope.invoice.id,
            number,
            total,
            currency: request.currency,
            due_date,
            payment_url,
        })
    }

    async fn invoice_status(
        &self,
        invoice_id: &str,
    ) -> Result<InvoiceStatusSnapshot, ProviderError> {
        let token = self.get_access_token().await?;

        let resp = self
            .http
            .get(format!(
                "{}/api/invoices/{}",
                self.config.base_url, invoice_id
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify_status(status, "invoice status"));
        }

        let envelope: InvoiceStatusEnvelope = resp.json().await.map_err(transport_error)?;
        Ok(InvoiceStatusSnapshot {
            status: envelope.invoice.status,
            total: envelope.invoice.total,
            payment_date: envelope.invoice.payment_date,
        })
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let resp = self
            .http
            .get(format!("{}/api/ping", self.config.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(classify_status(status, "ping"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> InvoicingConfig {
        InvoicingConfig {
            base_url: "https://billing.example.com/".to_string(),
            client_id: "client_1".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = InvoicingClient::new(config());
        assert_eq!(client.config.base_url, "https://billing.example.com");
    }

    #[test]
    fn test_payment_url_is_deterministic() {
        let client = InvoicingClient::new(config());
        assert_eq!(
            client.payment_url("inv_42"),
            "https://billing.example.com/pay/inv_42"
        );
        assert_eq!(client.payment_url("inv_42"), client.payment_url("inv_42"));
    }

    #[test]
    fn test_invoice_number_format() {
        let now = "2026-03-05T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let number = generate_invoice_number(now);

        assert!(number.starts_with("INV-20260305-"), "got {number}");
        assert_eq!(number.len(), "INV-20260305-".len() + 6);
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "x"),
            ProviderError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "x"),
            ProviderError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::CONFLICT, "x"),
            ProviderError::DuplicateResource(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "x"),
            ProviderError::Permanent(_)
        ));
    }
}
