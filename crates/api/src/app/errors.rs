use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use feedforge_formulation::FormulationError;

use crate::app::catalog_store::CatalogStoreError;

pub fn formulation_error_to_response(err: FormulationError) -> axum::response::Response {
    match err {
        FormulationError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        e @ FormulationError::InfeasibleBounds { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "infeasible_bounds", e.to_string())
        }
    }
}

pub fn catalog_store_error_to_response(err: CatalogStoreError) -> axum::response::Response {
    tracing::error!(error = %err, "catalog store failed");
    json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", err.to_string())
}

/// Malformed or mistyped request bodies are validation failures too.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
