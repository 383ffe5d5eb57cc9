//! Subscription status and usage summary handler.

use axum::extract::{Json, State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::tenant::TenantContext;
use crate::models::{limits, Category, UsagePeriod};
use crate::services::quota;
use crate::startup::AppState;
use service_core::error::AppError;

/// Usage of one category within the current period.
#[derive(Debug, Serialize)]
pub struct CategoryUsage {
    pub category: String,
    pub used: i64,
    /// Plan ceiling; -1 means uncapped.
    pub limit: i64,
    /// Remaining allowance; absent when uncapped.
    pub remaining: Option<i64>,
}

/// Subscription summary response.
#[derive(Debug, Serialize)]
pub struct SubscriptionSummaryResponse {
    pub plan: String,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub usage_period_start: DateTime<Utc>,
    pub usage_period_end: DateTime<Utc>,
    pub usage: Vec<CategoryUsage>,
}

/// Current subscription plus per-category usage against the plan ceilings.
///
/// GET /api/subscription
pub async fn subscription_summary(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<SubscriptionSummaryResponse>, AppError> {
    let subscription = state
        .subscriptions
        .get_by_tenant(tenant.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No subscription on file")))?;

    let plan = subscription.plan();
    let table = limits(plan);
    let period = UsagePeriod::current();

    let mut usage = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        let used = state
            .usage
            .current_count(tenant.tenant_id, category, period)
            .await?;
        usage.push(CategoryUsage {
            category: category.as_str().to_string(),
            used,
            limit: table.limit_for(category),
            remaining: quota::remaining(plan, category, used),
        });
    }

    Ok(Json(SubscriptionSummaryResponse {
        plan: subscription.plan,
        status: subscription.status,
        current_period_start: subscription.current_period_start,
        current_period_end: subscription.current_period_end,
        cancel_at_period_end: subscription.cancel_at_period_end,
        usage_period_start: period.start,
        usage_period_end: period.end,
        usage,
    }))
}
