//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: shared state (catalog store, configured optimizer)
//! - `catalog_store.rs`: tenant-isolated catalog storage
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod catalog_store;
pub mod config;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use catalog_store::{CatalogStore, InMemoryCatalogStore};
use config::ApiConfig;
use services::AppServices;

/// Build the full HTTP router with an in-memory catalog store.
pub fn build_app(config: &ApiConfig) -> Router {
    build_app_with_store(config, Arc::new(InMemoryCatalogStore::new()))
}

/// Build the router over a caller-supplied catalog store.
pub fn build_app_with_store(config: &ApiConfig, catalogs: Arc<dyn CatalogStore>) -> Router {
    let services = Arc::new(AppServices::new(catalogs, config.optimizer));

    // Tenant-scoped routes: require an X-Tenant-Id header.
    let scoped = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::tenant_middleware))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(scoped)
}
