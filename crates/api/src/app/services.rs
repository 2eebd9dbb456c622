//! Shared handler state.

use std::sync::Arc;

use axum::http::StatusCode;

use feedforge_core::TenantId;
use feedforge_formulation::{Ingredient, IngredientCatalog, Optimizer, OptimizerConfig};

use crate::app::catalog_store::CatalogStore;
use crate::app::errors;

#[derive(Clone)]
pub struct AppServices {
    catalogs: Arc<dyn CatalogStore>,
    optimizer: Optimizer,
}

impl AppServices {
    pub fn new(catalogs: Arc<dyn CatalogStore>, config: OptimizerConfig) -> Self {
        Self {
            catalogs,
            optimizer: Optimizer::new(config),
        }
    }

    pub fn catalogs(&self) -> &dyn CatalogStore {
        self.catalogs.as_ref()
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    /// Inline ingredients win; otherwise the tenant's stored catalog.
    pub fn resolve_catalog(
        &self,
        tenant_id: TenantId,
        inline: Option<Vec<Ingredient>>,
    ) -> Result<Arc<IngredientCatalog>, axum::response::Response> {
        match inline {
            Some(ingredients) => IngredientCatalog::new(ingredients)
                .map(Arc::new)
                .map_err(errors::formulation_error_to_response),
            None => self
                .catalogs
                .get(tenant_id)
                .map_err(errors::catalog_store_error_to_response)?
                .ok_or_else(|| {
                    errors::json_error(
                        StatusCode::NOT_FOUND,
                        "catalog_not_found",
                        "no ingredient catalog stored for this tenant",
                    )
                }),
        }
    }
}
