use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use feedforge_core::TenantId;
use feedforge_formulation::IngredientCatalog;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogStoreError {
    /// A writer panicked mid-update; nothing is read or written until restart.
    #[error("catalog store is unavailable")]
    Unavailable,
}

/// Tenant-isolated storage of each tenant's ingredient catalog.
///
/// Catalogs are handed out as shared snapshots: a replacement never changes a
/// catalog an in-flight request already holds.
pub trait CatalogStore: Send + Sync {
    fn get(&self, tenant_id: TenantId)
    -> Result<Option<Arc<IngredientCatalog>>, CatalogStoreError>;
    /// Store (or replace) the tenant's catalog. `Ok` only once it is stored.
    fn put(
        &self,
        tenant_id: TenantId,
        catalog: IngredientCatalog,
    ) -> Result<Arc<IngredientCatalog>, CatalogStoreError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn get(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Arc<IngredientCatalog>>, CatalogStoreError> {
        (**self).get(tenant_id)
    }

    fn put(
        &self,
        tenant_id: TenantId,
        catalog: IngredientCatalog,
    ) -> Result<Arc<IngredientCatalog>, CatalogStoreError> {
        (**self).put(tenant_id, catalog)
    }
}

/// In-memory tenant-isolated store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<HashMap<TenantId, Arc<IngredientCatalog>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn get(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Arc<IngredientCatalog>>, CatalogStoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| CatalogStoreError::Unavailable)?;
        Ok(map.get(&tenant_id).cloned())
    }

    fn put(
        &self,
        tenant_id: TenantId,
        catalog: IngredientCatalog,
    ) -> Result<Arc<IngredientCatalog>, CatalogStoreError> {
        let catalog = Arc::new(catalog);
        let mut map = self
            .inner
            .write()
            .map_err(|_| CatalogStoreError::Unavailable)?;
        map.insert(tenant_id, Arc::clone(&catalog));
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedforge_formulation::Ingredient;

    fn catalog(id: &str) -> IngredientCatalog {
        IngredientCatalog::new(vec![Ingredient {
            id: id.into(),
            protein_per_unit: 8.5,
            energy_per_unit: 3350.0,
            cost_per_unit: 0.65,
            min_inclusion: 0.0,
            max_inclusion: 100.0,
        }])
        .unwrap()
    }

    #[test]
    fn catalogs_are_tenant_isolated() {
        let store = InMemoryCatalogStore::new();
        let a = TenantId::new();
        let b = TenantId::new();

        store.put(a, catalog("corn")).unwrap();

        assert!(store.get(a).unwrap().is_some());
        assert!(store.get(b).unwrap().is_none());
    }

    #[test]
    fn put_replaces_without_touching_held_snapshots() {
        let store = InMemoryCatalogStore::new();
        let tenant = TenantId::new();

        let first = store.put(tenant, catalog("corn")).unwrap();
        store.put(tenant, catalog("wheat")).unwrap();

        assert!(first.contains(&"corn".into()));
        let current = store.get(tenant).unwrap().unwrap();
        assert!(current.contains(&"wheat".into()));
        assert!(!current.contains(&"corn".into()));
    }

    #[test]
    fn poisoned_store_reports_unavailable_instead_of_dropping_writes() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let tenant = TenantId::new();

        let poisoner = Arc::clone(&store);
        let crashed = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("writer crashed mid-update");
        })
        .join();
        assert!(crashed.is_err());

        assert_eq!(
            store.put(tenant, catalog("corn")).unwrap_err(),
            CatalogStoreError::Unavailable
        );
        assert_eq!(store.get(tenant).unwrap_err(), CatalogStoreError::Unavailable);
    }
}
