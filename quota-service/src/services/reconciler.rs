//! Billing reconciler.
//!
//! Applies verified provider events to local billing state. Delivery is
//! at-least-once and unordered, so every write is gated on the provider
//! event timestamp; replays and out-of-order events fall out as no-ops.
//! The tenant plan mirror is refreshed after every applied change.

use crate::models::{
    BillingEvent, BillingEventType, CreateSubscription, Plan, Subscription, SubscriptionChange,
    SubscriptionStatus,
};
use crate::services::metrics::record_billing_event;
use crate::services::repository::{SubscriptionStore, TenantStore};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of applying one event, reported back to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Subscription state was created or replaced.
    Created,
    /// An existing subscription was changed.
    Updated,
    /// Stale, replayed or unmatched event; acknowledged without effect.
    Skipped,
    /// Event type this service does not process.
    Unhandled,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Updated => "updated",
            ReconcileOutcome::Skipped => "skipped",
            ReconcileOutcome::Unhandled => "unhandled",
        }
    }
}

/// Maps a raw provider status code onto the local status vocabulary.
/// Unrecognized codes degrade to active rather than locking a tenant out.
fn map_provider_status(provider_status: Option<&str>) -> SubscriptionStatus {
    match provider_status {
        Some("trialing") => SubscriptionStatus::Trialing,
        Some("past_due") | Some("unpaid") => SubscriptionStatus::PastDue,
        Some("canceled") | Some("incomplete_expired") => SubscriptionStatus::Canceled,
        _ => SubscriptionStatus::Active,
    }
}

pub struct BillingReconciler {
    subscriptions: Arc<dyn SubscriptionStore>,
    tenants: Arc<dyn TenantStore>,
}

impl BillingReconciler {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, tenants: Arc<dyn TenantStore>) -> Self {
        Self {
            subscriptions,
            tenants,
        }
    }

    /// Apply one verified event. Always returns an outcome for deliverable
    /// events; errors are reserved for storage failures, so the provider
    /// retries only when retrying can help.
    #[instrument(skip(self, event), fields(event_id = %event.event_id, event_type = %event.event_type.as_str()))]
    pub async fn apply(&self, event: &BillingEvent) -> Result<ReconcileOutcome, AppError> {
        let outcome = match &event.event_type {
            BillingEventType::SubscriptionCreated => self.on_created(event).await?,
            BillingEventType::SubscriptionUpdated => self.on_updated(event).await?,
            BillingEventType::SubscriptionDeleted => self.on_deleted(event).await?,
            BillingEventType::InvoicePaid => {
                self.on_status_event(event, SubscriptionStatus::Active).await?
            }
            BillingEventType::InvoicePaymentFailed => {
                self.on_status_event(event, SubscriptionStatus::PastDue).await?
            }
            BillingEventType::Unknown(event_type) => {
                info!(event_type = %event_type, "Ignoring unhandled event type");
                ReconcileOutcome::Unhandled
            }
        };

        record_billing_event(event.event_type.as_str(), outcome.as_str());
        Ok(outcome)
    }

    async fn on_created(&self, event: &BillingEvent) -> Result<ReconcileOutcome, AppError> {
        let (Some(external_ref), Some(tenant_id)) = (&event.external_ref, event.tenant_id) else {
            warn!("Created event without subscription ref or tenant metadata");
            return Ok(ReconcileOutcome::Skipped);
        };

        if self.tenants.get_tenant(tenant_id).await?.is_none() {
            warn!(tenant_id = %tenant_id, "Created event for unknown tenant");
            return Ok(ReconcileOutcome::Skipped);
        }

        // Duplicate-creation guard keyed on the provider ref; the upsert's
        // ordering gate backs this up under concurrent replays.
        if self
            .subscriptions
            .get_by_external_ref(external_ref)
            .await?
            .is_some()
        {
            info!(external_ref = %external_ref, "Subscription already known");
            return Ok(ReconcileOutcome::Skipped);
        }

        let plan = event.plan.unwrap_or(Plan::Free);
        let input = CreateSubscription {
            tenant_id,
            plan,
            status: map_provider_status(event.provider_status.as_deref()),
            external_ref: Some(external_ref.clone()),
            current_period_start: event.current_period_start.unwrap_or(event.created_utc),
            current_period_end: event.current_period_end.unwrap_or(event.created_utc),
            cancel_at_period_end: event.cancel_at_period_end,
            last_event_utc: Some(event.created_utc),
        };

        match self.subscriptions.upsert_for_tenant(&input).await? {
            Some(subscription) => {
                self.mirror_plan(&subscription).await?;
                info!(tenant_id = %tenant_id, plan = %plan.as_str(), "Subscription created");
                Ok(ReconcileOutcome::Created)
            }
            None => Ok(ReconcileOutcome::Skipped),
        }
    }

    async fn on_updated(&self, event: &BillingEvent) -> Result<ReconcileOutcome, AppError> {
        let Some(external_ref) = &event.external_ref else {
            warn!("Updated event without subscription ref");
            return Ok(ReconcileOutcome::Skipped);
        };

        let change = SubscriptionChange {
            plan: event.plan,
            status: Some(map_provider_status(event.provider_status.as_deref())),
            current_period_start: event.current_period_start,
            current_period_end: event.current_period_end,
            cancel_at_period_end: Some(event.cancel_at_period_end),
        };

        match self
            .subscriptions
            .apply_event_change(external_ref, &change, event.created_utc)
            .await?
        {
            Some(subscription) => {
                self.mirror_plan(&subscription).await?;
                Ok(ReconcileOutcome::Updated)
            }
            None => Ok(ReconcileOutcome::Skipped),
        }
    }

    async fn on_deleted(&self, event: &BillingEvent) -> Result<ReconcileOutcome, AppError> {
        let Some(external_ref) = &event.external_ref else {
            warn!("Deleted event without subscription ref");
            return Ok(ReconcileOutcome::Skipped);
        };

        let change = SubscriptionChange {
            status: Some(SubscriptionStatus::Canceled),
            ..Default::default()
        };

        match self
            .subscriptions
            .apply_event_change(external_ref, &change, event.created_utc)
            .await?
        {
            Some(subscription) => {
                // A canceled tenant falls back to the free tier.
                self.tenants
                    .set_tenant_plan(subscription.tenant_id, Plan::Free)
                    .await?;
                info!(tenant_id = %subscription.tenant_id, "Subscription canceled");
                Ok(ReconcileOutcome::Updated)
            }
            None => Ok(ReconcileOutcome::Skipped),
        }
    }

    async fn on_status_event(
        &self,
        event: &BillingEvent,
        status: SubscriptionStatus,
    ) -> Result<ReconcileOutcome, AppError> {
        let Some(external_ref) = &event.external_ref else {
            // Invoices not tied to a subscription are none of our business.
            return Ok(ReconcileOutcome::Skipped);
        };

        let change = SubscriptionChange {
            status: Some(status),
            ..Default::default()
        };

        match self
            .subscriptions
            .apply_event_change(external_ref, &change, event.created_utc)
            .await?
        {
            Some(_) => Ok(ReconcileOutcome::Updated),
            None => Ok(ReconcileOutcome::Skipped),
        }
    }

    async fn mirror_plan(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.tenants
            .set_tenant_plan(subscription.tenant_id, subscription.plan())
            .await
    }
}
