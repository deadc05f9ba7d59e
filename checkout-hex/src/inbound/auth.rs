//! Identity middleware resolving the bearer credential to a user.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use checkout_types::{InvoicingGateway, OrderRepository};

use super::handlers::AppState;

/// Extracts the bearer credential from the Authorization header.
/// Expected format: "Bearer <token>" or just "<token>"
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    if header.starts_with("Bearer ") {
        Some(header.strip_prefix("Bearer ").unwrap())
    } else {
        Some(header)
    }
}

/// Resolves the caller through the identity collaborator and attaches the
/// resulting `AuthUser` as a request extension.
///
/// The middleware never rejects on its own: handlers decide whether an
/// anonymous request is allowed, so the orchestrator can record
/// unauthenticated purchase attempts in its audit log.
///
/// Paths that skip resolution entirely:
/// - `/health` - public health check
/// - `/api/webhooks/*` - provider deliveries authenticate by signature
/// - `/docs`, `/api-docs` - API documentation
pub async fn identity_middleware<R: OrderRepository, G: InvoicingGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path == "/health"
        || path.starts_with("/api/webhooks")
        || path.starts_with("/docs")
        || path.starts_with("/api-docs")
    {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    if let Some(token) = extract_bearer(auth_header).filter(|t| !t.is_empty()) {
        match state.identity.current_user(token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(user);
            }
            Ok(None) => {
                tracing::debug!("bearer credential did not resolve to a user");
            }
            Err(e) => {
                tracing::error!("identity resolution failed: {}", e);
            }
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_prefixed() {
        assert_eq!(
            extract_bearer(Some("Bearer tok_test_123")),
            Some("tok_test_123")
        );
    }

    #[test]
    fn test_extract_bearer_raw() {
        assert_eq!(extract_bearer(Some("tok_test_123")), Some("tok_test_123"));
    }

    #[test]
    fn test_extract_bearer_none() {
        assert_eq!(extract_bearer(None), None);
    }
}
