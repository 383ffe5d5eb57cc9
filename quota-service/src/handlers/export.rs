//! Content export handler.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::middleware::tenant::TenantContext;
use crate::startup::AppState;
use service_core::error::AppError;

/// Export a stored content record as a downloadable document. Metered
/// against the export category.
///
/// POST /api/export/{content_id}
pub async fn export_content(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(content_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = state
        .generation
        .export(tenant.tenant_id, content_id)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", document.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    ))
}
