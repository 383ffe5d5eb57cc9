//! In-memory store adapter.
//!
//! Backs local development and the integration tests. Per-key atomicity
//! comes from the dashmap entry API: an entry guard holds its shard lock, so
//! check-and-increment on a usage key and the reconciler ordering gate run
//! without interleaving.

use crate::models::{
    Category, ContentRecord, CreateContent, CreateSubscription, CreateTenant, Plan,
    Subscription, SubscriptionChange, Tenant, UsagePeriod,
};
use crate::services::repository::{ContentStore, SubscriptionStore, TenantStore, UsageStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use service_core::error::AppError;
use uuid::Uuid;

type UsageKey = (Uuid, Category, DateTime<Utc>);

/// In-memory store. One current subscription per tenant.
#[derive(Default)]
pub struct MemoryStore {
    tenants: DashMap<Uuid, Tenant>,
    subscriptions: DashMap<Uuid, Subscription>,
    external_refs: DashMap<String, Uuid>,
    usage: DashMap<UsageKey, i64>,
    contents: DashMap<Uuid, ContentRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn create_subscription(
        &self,
        input: &CreateSubscription,
    ) -> Result<Subscription, AppError> {
        if let Some(external_ref) = &input.external_ref {
            if self.external_refs.contains_key(external_ref) {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Subscription already exists"
                )));
            }
        }

        let now = Utc::now();
        let subscription = Subscription {
            subscription_id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            plan: input.plan.as_str().to_string(),
            status: input.status.as_str().to_string(),
            external_ref: input.external_ref.clone(),
            current_period_start: input.current_period_start,
            current_period_end: input.current_period_end,
            cancel_at_period_end: input.cancel_at_period_end,
            last_event_utc: input.last_event_utc,
            created_utc: now,
            updated_utc: now,
        };

        match self.subscriptions.entry(input.tenant_id) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().is_current() {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Tenant already has a current subscription"
                    )));
                }
                if let Some(old_ref) = &occupied.get().external_ref {
                    self.external_refs.remove(old_ref);
                }
                occupied.insert(subscription.clone());
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(subscription.clone());
            }
        }

        if let Some(external_ref) = &subscription.external_ref {
            self.external_refs
                .insert(external_ref.clone(), subscription.tenant_id);
        }

        Ok(subscription)
    }

    async fn upsert_for_tenant(
        &self,
        input: &CreateSubscription,
    ) -> Result<Option<Subscription>, AppError> {
        let now = Utc::now();

        let subscription = match self.subscriptions.entry(input.tenant_id) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                // Ordering gate: stale provider state is dropped.
                if let Some(stamp) = occupied.get().last_event_utc {
                    if input.last_event_utc.map_or(true, |event| stamp >= event) {
                        return Ok(None);
                    }
                }
                if let Some(old_ref) = &occupied.get().external_ref {
                    self.external_refs.remove(old_ref);
                }
                let existing = occupied.get_mut();
                existing.plan = input.plan.as_str().to_string();
                existing.status = input.status.as_str().to_string();
                existing.external_ref = input.external_ref.clone();
                existing.current_period_start = input.current_period_start;
                existing.current_period_end = input.current_period_end;
                existing.cancel_at_period_end = input.cancel_at_period_end;
                existing.last_event_utc = input.last_event_utc;
                existing.updated_utc = now;
                existing.clone()
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let subscription = Subscription {
                    subscription_id: Uuid::new_v4(),
                    tenant_id: input.tenant_id,
                    plan: input.plan.as_str().to_string(),
                    status: input.status.as_str().to_string(),
                    external_ref: input.external_ref.clone(),
                    current_period_start: input.current_period_start,
                    current_period_end: input.current_period_end,
                    cancel_at_period_end: input.cancel_at_period_end,
                    last_event_utc: input.last_event_utc,
                    created_utc: now,
                    updated_utc: now,
                };
                vacant.insert(subscription.clone());
                subscription
            }
        };

        if let Some(external_ref) = &subscription.external_ref {
            self.external_refs
                .insert(external_ref.clone(), subscription.tenant_id);
        }

        Ok(Some(subscription))
    }

    async fn get_by_tenant(&self, tenant_id: Uuid) -> Result<Option<Subscription>, AppError> {
        Ok(self.subscriptions.get(&tenant_id).map(|s| s.clone()))
    }

    async fn get_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let Some(tenant_id) = self.external_refs.get(external_ref).map(|t| *t) else {
            return Ok(None);
        };
        Ok(self.subscriptions.get(&tenant_id).map(|s| s.clone()))
    }

    async fn apply_event_change(
        &self,
        external_ref: &str,
        change: &SubscriptionChange,
        event_utc: DateTime<Utc>,
    ) -> Result<Option<Subscription>, AppError> {
        let Some(tenant_id) = self.external_refs.get(external_ref).map(|t| *t) else {
            return Ok(None);
        };

        let Some(mut subscription) = self.subscriptions.get_mut(&tenant_id) else {
            return Ok(None);
        };

        // Ordering gate, evaluated under the entry guard.
        if let Some(stamp) = subscription.last_event_utc {
            if stamp >= event_utc {
                return Ok(None);
            }
        }

        if let Some(plan) = change.plan {
            subscription.plan = plan.as_str().to_string();
        }
        if let Some(status) = change.status {
            subscription.status = status.as_str().to_string();
        }
        if let Some(start) = change.current_period_start {
            subscription.current_period_start = start;
        }
        if let Some(end) = change.current_period_end {
            subscription.current_period_end = end;
        }
        if let Some(cancel) = change.cancel_at_period_end {
            subscription.cancel_at_period_end = cancel;
        }
        subscription.last_event_utc = Some(event_utc);
        subscription.updated_utc = Utc::now();

        Ok(Some(subscription.clone()))
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn current_count(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
    ) -> Result<i64, AppError> {
        let key = (tenant_id, category, period.start);
        Ok(self.usage.get(&key).map(|c| *c).unwrap_or(0))
    }

    async fn increment(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
    ) -> Result<i64, AppError> {
        let key = (tenant_id, category, period.start);
        let mut count = self.usage.entry(key).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn try_consume(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
        limit: i64,
    ) -> Result<Option<i64>, AppError> {
        if limit <= 0 {
            return Ok(None);
        }

        let key = (tenant_id, category, period.start);
        let mut count = self.usage.entry(key).or_insert(0);
        if *count >= limit {
            return Ok(None);
        }
        *count += 1;
        Ok(Some(*count))
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn create_tenant(&self, input: &CreateTenant) -> Result<Tenant, AppError> {
        let now = Utc::now();
        let tenant = Tenant {
            tenant_id: input.tenant_id,
            name: input.name.clone(),
            plan: Plan::Free.as_str().to_string(),
            created_utc: now,
            updated_utc: now,
        };

        match self.tenants.entry(input.tenant_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::Conflict(
                anyhow::anyhow!("Tenant already exists"),
            )),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(tenant.clone());
                Ok(tenant)
            }
        }
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        Ok(self.tenants.get(&tenant_id).map(|t| t.clone()))
    }

    async fn set_tenant_plan(&self, tenant_id: Uuid, plan: Plan) -> Result<(), AppError> {
        if let Some(mut tenant) = self.tenants.get_mut(&tenant_id) {
            tenant.plan = plan.as_str().to_string();
            tenant.updated_utc = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_content(&self, input: &CreateContent) -> Result<ContentRecord, AppError> {
        let now = Utc::now();
        let body = serde_json::to_value(&input.body).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to serialize content body: {}", e))
        })?;

        let record = ContentRecord {
            content_id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            category: input.category.as_str().to_string(),
            status: input.status.as_str().to_string(),
            body,
            prompt: input.prompt.clone(),
            version: 1,
            created_utc: now,
            updated_utc: now,
        };

        self.contents.insert(record.content_id, record.clone());
        Ok(record)
    }

    async fn get_content(
        &self,
        tenant_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<ContentRecord>, AppError> {
        Ok(self
            .contents
            .get(&content_id)
            .filter(|record| record.tenant_id == tenant_id)
            .map(|record| record.clone()))
    }
}
