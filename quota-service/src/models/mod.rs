//! Domain models for quota-service.

mod billing_event;
mod content;
mod plan;
mod subscription;
mod tenant;
mod usage;

pub use billing_event::{BillingEvent, BillingEventType};
pub use content::{
    CalendarDay, ContentBody, ContentError, ContentRecord, ContentStatus, CreateContent, Scene,
};
pub use plan::{limits, Category, Plan, PlanLimits, UNLIMITED};
pub use subscription::{
    CreateSubscription, Subscription, SubscriptionChange, SubscriptionStatus,
};
pub use tenant::{CreateTenant, Tenant};
pub use usage::{UsageCounter, UsagePeriod};
