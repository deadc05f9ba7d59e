//! Catalog service domain model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Canonical identifier of a catalog service.
///
/// This is the stable identifier used for persistence; legacy slugs only
/// exist in the resolver's alias map and are never stored on orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ServiceId(Uuid);

impl ServiceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ServiceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Pricing levels a service can be purchased at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    Basic,
    Standard,
    Enterprise,
}

impl PackageTier {
    pub fn all() -> &'static [PackageTier] {
        &[
            PackageTier::Basic,
            PackageTier::Standard,
            PackageTier::Enterprise,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageTier::Basic => "basic",
            PackageTier::Standard => "standard",
            PackageTier::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for PackageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PackageTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(PackageTier::Basic),
            "standard" => Ok(PackageTier::Standard),
            "enterprise" => Ok(PackageTier::Enterprise),
            other => Err(DomainError::UnknownPackageTier(other.to_string())),
        }
    }
}

/// A purchasable service from the catalog.
///
/// Read-only to this crate: entries are administered out of band and
/// retrieved through the `CatalogProvider` port. Unit prices are in USD
/// minor units; any subset of tiers may be priced, but a valid entry has
/// at least one priced tier with a positive amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCatalogEntry {
    pub id: ServiceId,
    pub name: String,
    pub category: String,
    pub pricing: BTreeMap<PackageTier, i64>,
    #[serde(default)]
    pub features: BTreeMap<PackageTier, Vec<String>>,
}

impl ServiceCatalogEntry {
    /// Unit price for a tier, if the service offers it.
    pub fn price_for(&self, tier: PackageTier) -> Option<i64> {
        self.pricing.get(&tier).copied()
    }

    /// Checks the priced-tier invariant.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.pricing.values().any(|&price| price > 0) {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "service {} has no positively priced tier",
                self.id
            )))
        }
    }
}
