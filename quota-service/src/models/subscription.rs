//! Subscription model.

use crate::models::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Trialing,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Trialing => "trialing",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "canceled" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            "trialing" => SubscriptionStatus::Trialing,
            _ => SubscriptionStatus::Active,
        }
    }

    /// Whether the subscription entitles the tenant to generate.
    pub fn is_current(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

/// Subscription row. Created at tenant onboarding (plan=free) and mutated
/// exclusively by the billing reconciler afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub tenant_id: Uuid,
    pub plan: String,
    pub status: String,
    pub external_ref: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    /// Provider timestamp of the last applied billing event. Events not newer
    /// than this stamp are no-ops.
    pub last_event_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Subscription {
    pub fn plan(&self) -> Plan {
        Plan::from_string(&self.plan)
    }

    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_string(&self.status)
    }

    pub fn is_current(&self) -> bool {
        self.status().is_current()
    }
}

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub tenant_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub external_ref: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub last_event_utc: Option<DateTime<Utc>>,
}

/// Field changes applied by the reconciler. `None` leaves the field as-is.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionChange {
    pub plan: Option<Plan>,
    pub status: Option<SubscriptionStatus>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
}
