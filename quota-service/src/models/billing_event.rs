//! Typed billing provider events.
//!
//! The service only ever consumes events that already passed webhook
//! signature verification; raw provider payloads are parsed at the boundary
//! (`services::billing`) and never inside the reconciler.

use crate::models::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingEventType {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaid,
    InvoicePaymentFailed,
    /// Accepted and reported as not handled, never an error.
    Unknown(String),
}

impl BillingEventType {
    pub fn as_str(&self) -> &str {
        match self {
            BillingEventType::SubscriptionCreated => "subscription_created",
            BillingEventType::SubscriptionUpdated => "subscription_updated",
            BillingEventType::SubscriptionDeleted => "subscription_deleted",
            BillingEventType::InvoicePaid => "invoice_paid",
            BillingEventType::InvoicePaymentFailed => "invoice_payment_failed",
            BillingEventType::Unknown(s) => s.as_str(),
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "subscription_created" | "customer.subscription.created" => {
                BillingEventType::SubscriptionCreated
            }
            "subscription_updated" | "customer.subscription.updated" => {
                BillingEventType::SubscriptionUpdated
            }
            "subscription_deleted" | "customer.subscription.deleted" => {
                BillingEventType::SubscriptionDeleted
            }
            "invoice_paid" | "invoice.paid" => BillingEventType::InvoicePaid,
            "invoice_payment_failed" | "invoice.payment_failed" => {
                BillingEventType::InvoicePaymentFailed
            }
            other => BillingEventType::Unknown(other.to_string()),
        }
    }
}

/// A verified billing event. Delivery is at-least-once and unordered; the
/// provider-assigned `created_utc` is the ordering authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub event_id: String,
    pub event_type: BillingEventType,
    /// Provider-side subscription reference. Absent on invoice events that
    /// are not tied to a subscription.
    pub external_ref: Option<String>,
    /// Tenant the subscription belongs to; carried in provider metadata on
    /// subscription events.
    pub tenant_id: Option<Uuid>,
    pub plan: Option<Plan>,
    /// Raw provider status code, mapped by the reconciler.
    pub provider_status: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    /// Provider-assigned creation timestamp used for the ordering gate.
    pub created_utc: DateTime<Utc>,
}
