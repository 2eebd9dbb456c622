use axum::Router;

pub mod catalog;
pub mod formulations;
pub mod system;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/catalog", catalog::router())
        .nest("/formulations", formulations::router())
}
