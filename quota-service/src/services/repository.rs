//! Storage capability traits.
//!
//! The core depends only on these interfaces; Postgres (`database`) and
//! in-memory (`memory`) adapters implement them. Writes are serialized per
//! key by the adapters: subscriptions by tenant/external ref, usage counters
//! by (tenant, category, period).

use crate::models::{
    Category, ContentRecord, CreateContent, CreateSubscription, CreateTenant, Plan, Subscription,
    SubscriptionChange, Tenant, UsagePeriod,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

/// Subscription persistence. The billing reconciler is the only writer after
/// onboarding.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn create_subscription(
        &self,
        input: &CreateSubscription,
    ) -> Result<Subscription, AppError>;

    /// Replace the tenant's subscription row, gated on the ordering stamp:
    /// the write takes effect only when `input.last_event_utc` is strictly
    /// newer than the stored stamp (or no row exists). Returns `None` when
    /// the incoming state is stale. Used by the reconciler for provider
    /// "created" events, which supersede the onboarding free subscription.
    async fn upsert_for_tenant(
        &self,
        input: &CreateSubscription,
    ) -> Result<Option<Subscription>, AppError>;

    /// Current subscription for a tenant (at most one by invariant).
    async fn get_by_tenant(&self, tenant_id: Uuid) -> Result<Option<Subscription>, AppError>;

    async fn get_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Subscription>, AppError>;

    /// Apply a reconciler change, gated on the ordering stamp: the update
    /// takes effect only when `event_utc` is strictly newer than the stored
    /// `last_event_utc` (or no stamp exists yet). Returns the updated row, or
    /// `None` when the row is missing or the event is stale.
    async fn apply_event_change(
        &self,
        external_ref: &str,
        change: &SubscriptionChange,
        event_utc: DateTime<Utc>,
    ) -> Result<Option<Subscription>, AppError>;
}

/// Usage ledger: period-scoped counters with atomic compare-and-increment.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Count for the key; 0 when no row exists.
    async fn current_count(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
    ) -> Result<i64, AppError>;

    /// Unconditional atomic create-or-increment. Returns the post-increment
    /// count; no lost updates under concurrent callers on the same key.
    async fn increment(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
    ) -> Result<i64, AppError>;

    /// Atomic check-and-consume: increments only while the pre-increment
    /// count is below `limit`. Returns the post-increment count, or `None`
    /// when the ceiling is already reached. `limit` must be finite and
    /// positive; unlimited plans use `increment`.
    async fn try_consume(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
        limit: i64,
    ) -> Result<Option<i64>, AppError>;
}

/// Tenant persistence, including the mirrored plan.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn create_tenant(&self, input: &CreateTenant) -> Result<Tenant, AppError>;

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError>;

    async fn set_tenant_plan(&self, tenant_id: Uuid, plan: Plan) -> Result<(), AppError>;
}

/// Generated-content persistence.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_content(&self, input: &CreateContent) -> Result<ContentRecord, AppError>;

    async fn get_content(
        &self,
        tenant_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<ContentRecord>, AppError>;
}
