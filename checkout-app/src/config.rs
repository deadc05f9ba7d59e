//! Configuration loading from environment.

use std::env;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Path to the catalog JSON document published by administration.
    pub catalog_path: String,
    /// Base URL of the auth/profile collaborator.
    pub identity_url: String,
    pub invoicing_base_url: String,
    pub invoicing_client_id: String,
    pub invoicing_client_secret: String,
    pub invoicing_refresh_token: String,
    /// Shared secret for provider webhook signatures; unsigned deliveries
    /// are accepted when unset.
    pub webhook_secret: Option<String>,
    /// Target of the notification collaborator; the confirmation worker is
    /// only started when set.
    pub notification_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let catalog_path =
            env::var("CATALOG_PATH").unwrap_or_else(|_| "catalog.json".to_string());

        let identity_url = env::var("IDENTITY_URL")
            .map_err(|_| anyhow::anyhow!("IDENTITY_URL environment variable is required"))?;

        let invoicing_base_url = env::var("INVOICING_BASE_URL")
            .map_err(|_| anyhow::anyhow!("INVOICING_BASE_URL environment variable is required"))?;
        let invoicing_client_id = env::var("INVOICING_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("INVOICING_CLIENT_ID environment variable is required"))?;
        let invoicing_client_secret = env::var("INVOICING_CLIENT_SECRET").map_err(|_| {
            anyhow::anyhow!("INVOICING_CLIENT_SECRET environment variable is required")
        })?;
        let invoicing_refresh_token = env::var("INVOICING_REFRESH_TOKEN").map_err(|_| {
            anyhow::anyhow!("INVOICING_REFRESH_TOKEN environment variable is required")
        })?;

        let webhook_secret = env::var("INVOICING_WEBHOOK_SECRET").ok();
        let notification_url = env::var("NOTIFICATION_URL").ok();

        Ok(Self {
            port,
            database_url,
            catalog_path,
            identity_url,
            invoicing_base_url,
            invoicing_client_id,
            invoicing_client_secret,
            invoicing_refresh_token,
            webhook_secret,
            notification_url,
        })
    }
}
