use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::put,
};

use feedforge_formulation::IngredientCatalog;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new().route("/", put(put_catalog).get(get_catalog))
}

pub async fn put_catalog(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    body: Result<Json<dto::PutCatalogRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let catalog = match IngredientCatalog::new(body.ingredients) {
        Ok(c) => c,
        Err(e) => return errors::formulation_error_to_response(e),
    };

    let stored = match services.catalogs().put(tenant.tenant_id(), catalog) {
        Ok(stored) => stored,
        Err(e) => return errors::catalog_store_error_to_response(e),
    };
    tracing::info!(
        tenant_id = %tenant.tenant_id(),
        ingredients = stored.len(),
        "catalog stored"
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({ "count": stored.len() })),
    )
        .into_response()
}

pub async fn get_catalog(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services.catalogs().get(tenant.tenant_id()) {
        Ok(Some(catalog)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "ingredients": catalog.as_slice() })),
        )
            .into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "catalog_not_found",
            "no ingredient catalog stored for this tenant",
        ),
        Err(e) => errors::catalog_store_error_to_response(e),
    }
}
