//! Error types for the checkout service.

use exchange_rates::Currency;

use crate::domain::ClientId;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    #[error("Unknown package tier: {0}")]
    UnknownPackageTier(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors from the external invoicing provider, pre-classified so the
/// orchestrator can decide retry eligibility without inspecting
/// provider-specific error shapes.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Misconfigured or expired credentials (token endpoint 400/401).
    /// Never retried; logged as critical.
    #[error("Provider configuration error: {0}")]
    Configuration(String),

    /// Network timeout or provider 5xx. Retried with backoff.
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Provider 4xx other than duplicate-resource. Never retried.
    #[error("Permanent provider error: {0}")]
    Permanent(String),

    /// The provider already holds this resource. Not a failure: callers
    /// fall back to a lookup of the existing record.
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The persistence boundary rejected the row (tier/amount/reference
    /// constraints). Authoritative last-line invariant check; never retried.
    #[error("Order validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors for the purchase pipeline.
///
/// Every variant surfaced to a caller carries a normalized message;
/// provider-internal error bodies never leak past this boundary.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Email address is not verified")]
    EmailNotVerified,

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Package '{package}' is not available for this service")]
    InvalidPackage { package: String },

    #[error("Client profile not found: {0}")]
    ProfileNotFound(ClientId),

    #[error("Order validation failed: {0}")]
    OrderValidationFailed(String),

    #[error("Order not found: {0}")]
    OrderNotFound(crate::domain::OrderId),

    #[error("Billing is not configured correctly")]
    Configuration(String),

    #[error(transparent)]
    Provider(ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProviderError> for CheckoutError {
    fn from(err: ProviderError) -> Self {
        match err {
            // Configuration failures are their own class: terminal, logged
            // as critical, never presented as a provider hiccup.
            ProviderError::Configuration(msg) => CheckoutError::Configuration(msg),
            other => CheckoutError::Provider(other),
        }
    }
}

impl CheckoutError {
    /// Message safe to return to the end user.
    pub fn public_message(&self) -> String {
        match self {
            CheckoutError::Configuration(_) => "Billing is not configured correctly".to_string(),
            CheckoutError::Provider(ProviderError::Transient(_)) => {
                "The billing provider is temporarily unavailable, please retry".to_string()
            }
            CheckoutError::Provider(_) => "The billing provider rejected the request".to_string(),
            CheckoutError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RepoError> for CheckoutError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Validation(msg) => CheckoutError::OrderValidationFailed(msg),
            RepoError::Domain(e) => CheckoutError::OrderValidationFailed(e.to_string()),
            RepoError::NotFound => CheckoutError::Internal("order not found".into()),
            RepoError::Database(e) => CheckoutError::Internal(e),
            RepoError::Conflict(e) => CheckoutError::Internal(e),
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        CheckoutError::OrderValidationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(ProviderError::Transient("timeout".into()).is_retryable());
        assert!(!ProviderError::Configuration("bad refresh token".into()).is_retryable());
        assert!(!ProviderError::Permanent("422".into()).is_retryable());
        assert!(!ProviderError::DuplicateResource("customer".into()).is_retryable());
    }

    #[test]
    fn test_repo_validation_maps_to_order_validation_failed() {
        let err: CheckoutError = RepoError::Validation("bad package".into()).into();
        assert!(matches!(err, CheckoutError::OrderValidationFailed(_)));
    }

    #[test]
    fn test_provider_bodies_do_not_leak() {
        let err = CheckoutError::Provider(ProviderError::Permanent(
            "{\"detail\":\"internal provider dump\"}".into(),
        ));
        assert!(!err.public_message().contains("provider dump"));
    }

    #[test]
    fn test_configuration_errors_keep_their_own_class() {
        let err: CheckoutError = ProviderError::Configuration("bad refresh token".into()).into();
        assert!(matches!(err, CheckoutError::Configuration(_)));

        let err: CheckoutError = ProviderError::Transient("timeout".into()).into();
        assert!(matches!(
            err,
            CheckoutError::Provider(ProviderError::Transient(_))
        ));
    }
}
