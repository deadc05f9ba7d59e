//! Catalog collaborator port.

use crate::domain::ServiceCatalogEntry;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the service catalog. Entries are administered out
/// of band; this port never mutates them.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync + 'static {
    async fn list_services(&self) -> Result<Vec<ServiceCatalogEntry>, CatalogError>;
}
