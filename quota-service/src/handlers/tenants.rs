//! Tenant onboarding handlers.

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateSubscription, CreateTenant, Plan, SubscriptionStatus, Tenant};
use crate::startup::AppState;
use service_core::error::AppError;

/// Request to onboard a new tenant.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

/// Tenant response.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub tenant_id: Uuid,
    pub name: String,
    pub plan: String,
    pub created_utc: chrono::DateTime<Utc>,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            tenant_id: tenant.tenant_id,
            name: tenant.name,
            plan: tenant.plan,
            created_utc: tenant.created_utc,
        }
    }
}

/// Onboard a tenant: creates the tenant row plus its free subscription.
///
/// POST /api/tenants
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(req): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<TenantResponse>), AppError> {
    req.validate()?;

    let tenant = state
        .tenants
        .create_tenant(&CreateTenant {
            tenant_id: Uuid::new_v4(),
            name: req.name,
        })
        .await?;

    // Every tenant starts on the free tier; the billing reconciler is the
    // only writer of subscription state afterwards.
    let now = Utc::now();
    state
        .subscriptions
        .create_subscription(&CreateSubscription {
            tenant_id: tenant.tenant_id,
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            external_ref: None,
            current_period_start: now,
            current_period_end: now + Duration::days(30),
            cancel_at_period_end: false,
            last_event_utc: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(tenant.into())))
}
