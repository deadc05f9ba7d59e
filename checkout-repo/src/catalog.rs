//! File-backed catalog adapter.
//!
//! Catalog administration is out of scope for this service; entries are
//! published as a JSON document and loaded read-only at startup.

use std::path::Path;

use async_trait::async_trait;
use checkout_types::{CatalogError, CatalogProvider, ServiceCatalogEntry};

pub struct FileCatalog {
    entries: Vec<ServiceCatalogEntry>,
}

impl FileCatalog {
    /// Loads and validates the catalog document.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let entries: Vec<ServiceCatalogEntry> = serde_json::from_str(&raw)?;
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<ServiceCatalogEntry>) -> anyhow::Result<Self> {
        for entry in &entries {
            entry
                .validate()
                .map_err(|e| anyhow::anyhow!("invalid catalog entry {}: {}", entry.id, e))?;
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CatalogProvider for FileCatalog {
    async fn list_services(&self) -> Result<Vec<ServiceCatalogEntry>, CatalogError> {
        Ok(self.entries.clone())
    }
}
