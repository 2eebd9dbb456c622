use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use feedforge_core::TenantId;

use crate::app::errors::json_error;
use crate::context::TenantContext;

/// Header carrying the caller's tenant (authentication happens upstream).
pub const TENANT_HEADER: &str = "x-tenant-id";

pub async fn tenant_middleware(mut req: Request, next: Next) -> Response {
    let tenant_id = match extract_tenant(req.headers()) {
        Ok(t) => t,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, "invalid_tenant", message),
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));

    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, String> {
    let header = headers
        .get(TENANT_HEADER)
        .ok_or_else(|| "missing X-Tenant-Id header".to_string())?;

    let header = header
        .to_str()
        .map_err(|_| "X-Tenant-Id header is not valid ASCII".to_string())?;

    header.parse::<TenantId>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_rejected() {
        let err = extract_tenant(&HeaderMap::new()).unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn malformed_uuid_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(extract_tenant(&headers).is_err());
    }

    #[test]
    fn valid_header_yields_tenant() {
        let tenant_id = TenantId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            TENANT_HEADER,
            HeaderValue::from_str(&tenant_id.to_string()).unwrap(),
        );
        assert_eq!(extract_tenant(&headers).unwrap(), tenant_id);
    }
}
