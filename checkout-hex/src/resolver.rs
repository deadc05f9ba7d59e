//! Service identifier resolution.
//!
//! Purchases may reference a service by its canonical id or by a legacy
//! slug ("ssl-setup"). Slugs are resolved through an alias map derived from
//! catalog display names by an ordered, data-driven rule table. The catalog
//! snapshot and the alias map live in an explicit process-wide cache with
//! no TTL; catalog changes are rare and administrator-driven, so staleness
//! is resolved by an explicit [`ServiceResolver::invalidate`] only.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use checkout_types::{CatalogProvider, CheckoutError, ServiceCatalogEntry, ServiceId};

/// One alias-derivation rule: if a catalog entry's display name contains
/// any of `keywords` (case-insensitive), the entry claims `aliases`.
pub struct AliasRule {
    pub keywords: &'static [&'static str],
    pub aliases: &'static [&'static str],
}

/// Ordered rule table. Per catalog entry the first matching rule wins; a
/// single rule may populate several alias keys. An alias claimed by an
/// earlier entry is never overwritten by a later one.
pub const ALIAS_RULES: &[AliasRule] = &[
    AliasRule {
        keywords: &["ssl", "https"],
        aliases: &["ssl-setup", "ssl-certificate"],
    },
    AliasRule {
        keywords: &["email", "mailbox"],
        aliases: &["email-migration", "email-setup"],
    },
    AliasRule {
        keywords: &["domain", "dns"],
        aliases: &["domain-setup", "dns-setup"],
    },
    AliasRule {
        keywords: &["hosting", "server"],
        aliases: &["web-hosting"],
    },
    AliasRule {
        keywords: &["backup"],
        aliases: &["backup-service"],
    },
    AliasRule {
        keywords: &["seo", "search"],
        aliases: &["seo-audit"],
    },
];

struct CacheState {
    services: HashMap<ServiceId, ServiceCatalogEntry>,
    aliases: HashMap<String, ServiceId>,
}

/// Resolves loosely-typed service identifiers to catalog entries.
///
/// Explicitly injected (not a singleton) so tests can use a fresh instance.
pub struct ServiceResolver {
    catalog: Arc<dyn CatalogProvider>,
    rules: &'static [AliasRule],
    cache: RwLock<Option<Arc<CacheState>>>,
}

impl ServiceResolver {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self::with_rules(catalog, ALIAS_RULES)
    }

    pub fn with_rules(catalog: Arc<dyn CatalogProvider>, rules: &'static [AliasRule]) -> Self {
        Self {
            catalog,
            rules,
            cache: RwLock::new(None),
        }
    }

    /// Resolves an identifier to its catalog entry.
    ///
    /// A well-formed canonical id is verified directly against the catalog
    /// and never falls back to alias matching, so a typo'd id cannot
    /// silently resolve to an unrelated service. Catalog outages surface
    /// as "service not found", never as a raw store error.
    pub async fn resolve(&self, identifier: &str) -> Result<ServiceCatalogEntry, CheckoutError> {
        let cache = self.load_cache().await?;

        if let Ok(id) = identifier.parse::<ServiceId>() {
            return cache
                .services
                .get(&id)
                .cloned()
                .ok_or_else(|| CheckoutError::ServiceNotFound(identifier.to_string()));
        }

        let slug = identifier.trim().to_lowercase();
        cache
            .aliases
            .get(&slug)
            .and_then(|id| cache.services.get(id))
            .cloned()
            .ok_or_else(|| CheckoutError::ServiceNotFound(identifier.to_string()))
    }

    /// Display name for a known service id, if the catalog has it.
    pub async fn service_name(&self, id: ServiceId) -> Option<String> {
        let cache = self.load_cache().await.ok()?;
        cache.services.get(&id).map(|entry| entry.name.clone())
    }

    /// Drops the cached catalog snapshot and alias map.
    pub fn invalidate(&self) {
        *self.cache.write().expect("resolver cache lock poisoned") = None;
    }

    async fn load_cache(&self) -> Result<Arc<CacheState>, CheckoutError> {
        if let Some(state) = self.cache.read().expect("resolver cache lock poisoned").clone() {
            return Ok(state);
        }

        // Cold path: fetch outside the lock; a concurrent rebuild is
        // harmless since both produce the same snapshot.
        let entries = self.catalog.list_services().await.map_err(|e| {
            tracing::warn!(error = %e, "catalog listing failed during resolution");
            CheckoutError::ServiceNotFound("catalog unavailable".to_string())
        })?;

        let state = Arc::new(build_cache(entries, self.rules));
        *self.cache.write().expect("resolver cache lock poisoned") = Some(state.clone());
        Ok(state)
    }
}

fn build_cache(entries: Vec<ServiceCatalogEntry>, rules: &[AliasRule]) -> CacheState {
    let mut services = HashMap::new();
    let mut aliases: HashMap<String, ServiceId> = HashMap::new();

    for entry in entries {
        let name = entry.name.to_lowercase();
        if let Some(rule) = rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| name.contains(k)))
        {
            for &alias in rule.aliases {
                aliases.entry(alias.to_string()).or_insert(entry.id);
            }
        }
        services.insert(entry.id, entry);
    }

    CacheState { services, aliases }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use checkout_types::{CatalogError, PackageTier};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubCatalog {
        entries: Vec<ServiceCatalogEntry>,
        list_calls: AtomicU32,
    }

    #[async_trait]
    impl CatalogProvider for StubCatalog {
        async fn list_services(&self) -> Result<Vec<ServiceCatalogEntry>, CatalogError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }
    }

    fn entry(name: &str) -> ServiceCatalogEntry {
        ServiceCatalogEntry {
            id: ServiceId::new(),
            name: name.to_string(),
            category: "services".to_string(),
            pricing: [(PackageTier::Standard, 1000)].into_iter().collect(),
            features: BTreeMap::new(),
        }
    }

    fn resolver_with(entries: Vec<ServiceCatalogEntry>) -> (Arc<StubCatalog>, ServiceResolver) {
        let catalog = Arc::new(StubCatalog {
            entries,
            list_calls: AtomicU32::new(0),
        });
        (catalog.clone(), ServiceResolver::new(catalog))
    }

    #[tokio::test]
    async fn test_canonical_id_resolves_to_itself() {
        let ssl = entry("SSL Certificate Setup");
        let id = ssl.id;
        let (_, resolver) = resolver_with(vec![ssl]);

        let resolved = resolver.resolve(&id.to_string()).await.unwrap();
        assert_eq!(resolved.id, id);
    }

    #[tokio::test]
    async fn test_well_formed_unknown_id_has_no_alias_fallback() {
        let (_, resolver) = resolver_with(vec![entry("SSL Certificate Setup")]);

        // A valid UUID that is not in the catalog must not fall through to
        // alias matching.
        let missing = ServiceId::new().to_string();
        let result = resolver.resolve(&missing).await;
        assert!(matches!(result, Err(CheckoutError::ServiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_alias_resolution() {
        let ssl = entry("SSL Certificate Setup");
        let ssl_id = ssl.id;
        let (_, resolver) = resolver_with(vec![ssl, entry("Email Migration")]);

        assert_eq!(resolver.resolve("ssl-setup").await.unwrap().id, ssl_id);
        assert_eq!(resolver.resolve("SSL-Setup").await.unwrap().id, ssl_id);
        assert!(resolver.resolve("nonexistent-slug").await.is_err());
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins_per_entry() {
        // Name matches both the ssl and email rules; only the first rule's
        // aliases are claimed.
        let combo = entry("SSL and Email Bundle");
        let id = combo.id;
        let (_, resolver) = resolver_with(vec![combo]);

        assert_eq!(resolver.resolve("ssl-setup").await.unwrap().id, id);
        assert!(resolver.resolve("email-migration").await.is_err());
    }

    #[tokio::test]
    async fn test_earlier_entry_keeps_alias() {
        let first = entry("SSL Certificate Setup");
        let second = entry("SSL Renewal");
        let first_id = first.id;
        let (_, resolver) = resolver_with(vec![first, second]);

        assert_eq!(resolver.resolve("ssl-setup").await.unwrap().id, first_id);
    }

    #[tokio::test]
    async fn test_cache_is_reused_and_clearable() {
        let ssl = entry("SSL Certificate Setup");
        let ssl_id = ssl.id;
        let (catalog, resolver) = resolver_with(vec![ssl]);

        assert_eq!(resolver.resolve("ssl-setup").await.unwrap().id, ssl_id);
        assert_eq!(resolver.resolve("ssl-certificate").await.unwrap().id, ssl_id);
        assert_eq!(catalog.list_calls.load(Ordering::SeqCst), 1);

        // Restartability: a cleared cache rebuilds to the same mapping.
        resolver.invalidate();
        assert_eq!(resolver.resolve("ssl-setup").await.unwrap().id, ssl_id);
        assert_eq!(catalog.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_catalog_outage_reports_not_found() {
        struct DownCatalog;

        #[async_trait]
        impl CatalogProvider for DownCatalog {
            async fn list_services(&self) -> Result<Vec<ServiceCatalogEntry>, CatalogError> {
                Err(CatalogError::Unavailable("connection refused".into()))
            }
        }

        let resolver = ServiceResolver::new(Arc::new(DownCatalog));
        let result = resolver.resolve("ssl-setup").await;
        assert!(matches!(result, Err(CheckoutError::ServiceNotFound(_))));
    }
}
