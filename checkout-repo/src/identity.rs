//! HTTP adapter for the auth/profile collaborator.

use async_trait::async_trait;
use serde::Deserialize;

use checkout_types::{AuthUser, ClientId, ClientProfile, IdentityError, IdentityProvider};

/// Identity service client.
///
/// A missing or unresolvable credential is `Ok(None)`; only transport
/// failures surface as errors.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct MeResponse {
    id: ClientId,
    email: String,
    email_verified_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_user(&self, bearer: &str) -> Result<Option<AuthUser>, IdentityError> {
        let resp = self
            .client
            .get(format!("{}/api/me", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let me: MeResponse = resp
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        Ok(Some(AuthUser {
            id: me.id,
            email: me.email,
            email_verified_at: me.email_verified_at,
        }))
    }

    async fn client_profile(
        &self,
        id: ClientId,
    ) -> Result<Option<ClientProfile>, IdentityError> {
        let resp = self
            .client
            .get(format!("{}/api/clients/{}/profile", self.base_url, id))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        resp.json()
            .await
            .map(Some)
            .map_err(|e| IdentityError::Unavailable(e.to_string()))
    }
}
