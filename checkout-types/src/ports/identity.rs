//! Auth/profile collaborator port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ClientId;

/// The authenticated caller, as resolved by the identity collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: ClientId,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Billing profile of a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Port to the authentication/profile system.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolves a bearer credential to the current user, if any.
    async fn current_user(&self, bearer: &str) -> Result<Option<AuthUser>, IdentityError>;

    /// Loads the client's billing profile.
    async fn client_profile(&self, id: ClientId)
        -> Result<Option<ClientProfile>, IdentityError>;
}
