use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/evaluate", post(evaluate))
        .route("/optimize", post(optimize))
}

pub async fn evaluate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    body: Result<Json<dto::EvaluateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let catalog = match services.resolve_catalog(tenant.tenant_id(), body.ingredients) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let result = match services
        .optimizer()
        .evaluator()
        .evaluate(&body.state, &catalog, &body.target)
    {
        Ok(r) => r,
        Err(e) => return errors::formulation_error_to_response(e),
    };

    tracing::debug!(
        tenant_id = %tenant.tenant_id(),
        feasible = result.feasible,
        score = result.efficiency_score,
        "formulation evaluated"
    );

    (StatusCode::OK, Json(result)).into_response()
}

pub async fn optimize(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    body: Result<Json<dto::OptimizeRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let catalog = match services.resolve_catalog(tenant.tenant_id(), body.ingredients) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    // The search is CPU-bound; keep it off the async workers.
    let optimizer = *services.optimizer();
    let target = body.target;
    let joined =
        tokio::task::spawn_blocking(move || optimizer.optimize(&catalog, &target)).await;

    let outcome = match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return errors::formulation_error_to_response(e),
        Err(e) => {
            tracing::error!(error = %e, "optimizer task failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "optimization failed",
            );
        }
    };

    tracing::info!(
        tenant_id = %tenant.tenant_id(),
        feasible = outcome.result.feasible,
        score = outcome.result.efficiency_score,
        rounds = outcome.rounds,
        "formulation optimized"
    );

    (StatusCode::OK, Json(outcome)).into_response()
}
