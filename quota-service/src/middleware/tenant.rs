//! Tenant context extractor for multi-tenant request scoping.
//!
//! The tenant id arrives in the X-Tenant-ID header, set by the API gateway
//! after authentication. Every metered route takes this extractor; a request
//! without a valid tenant never reaches a handler.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Tenant context extracted from request headers.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub tenant_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(TENANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!("Missing X-Tenant-ID header"))
            })?;

        let tenant_id = Uuid::parse_str(raw).map_err(|_| {
            AppError::AuthError(anyhow::anyhow!("X-Tenant-ID is not a valid UUID"))
        })?;

        tracing::Span::current().record("tenant_id", raw);

        Ok(TenantContext { tenant_id })
    }
}
