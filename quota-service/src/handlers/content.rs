//! Content generation and retrieval handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::tenant::TenantContext;
use crate::models::{Category, ContentRecord};
use crate::services::providers::ContentRequest;
use crate::startup::AppState;
use service_core::error::AppError;

/// Request to generate content.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateContentRequest {
    #[validate(length(min = 1, max = 500))]
    pub topic: String,
    #[validate(length(max = 200))]
    pub target_audience: Option<String>,
    #[validate(length(max = 50))]
    pub tone: Option<String>,
}

/// Content response.
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content_id: Uuid,
    pub category: String,
    pub status: String,
    pub body: serde_json::Value,
    pub prompt: String,
    pub created_utc: DateTime<Utc>,
}

impl From<ContentRecord> for ContentResponse {
    fn from(record: ContentRecord) -> Self {
        Self {
            content_id: record.content_id,
            category: record.category,
            status: record.status,
            body: record.body,
            prompt: record.prompt,
            created_utc: record.created_utc,
        }
    }
}

fn parse_category(raw: &str) -> Result<Category, AppError> {
    let category = Category::from_string(raw)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Unknown category: {}", raw)))?;
    if category == Category::Export {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "export has its own endpoint"
        )));
    }
    Ok(category)
}

/// Generate content of one category for the calling tenant.
///
/// POST /api/content/{category}
pub async fn generate_content(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(category): Path<String>,
    Json(req): Json<GenerateContentRequest>,
) -> Result<(StatusCode, Json<ContentResponse>), AppError> {
    req.validate()?;
    let category = parse_category(&category)?;

    let record = state
        .generation
        .generate(
            tenant.tenant_id,
            &ContentRequest {
                category,
                topic: req.topic,
                target_audience: req.target_audience,
                tone: req.tone,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Fetch one content record. Tenant-scoped; foreign ids read as absent.
///
/// GET /api/content/{content_id}
pub async fn get_content(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(content_id): Path<Uuid>,
) -> Result<Json<ContentResponse>, AppError> {
    let record = state
        .contents
        .get_content(tenant.tenant_id, content_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Content not found")))?;

    Ok(Json(record.into()))
}
