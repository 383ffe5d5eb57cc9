//! Quota guard.
//!
//! Pure admission logic: reads the entitlement table and a ledger count, no
//! clock and no storage. The guard result before generation is advisory; the
//! ledger's `try_consume` is the enforcement point.

use crate::models::{limits, Category, Plan, Subscription, UNLIMITED};
use service_core::error::AppError;

/// Whether a tenant on `plan` with `used` completions this period may run
/// another `category` operation. Returns the denial reason when not.
pub fn can_generate(plan: Plan, category: Category, used: i64) -> (bool, String) {
    let limit = limits(plan).limit_for(category);
    if limit == UNLIMITED || used < limit {
        return (true, String::new());
    }
    (
        false,
        format!(
            "Monthly {} limit reached ({} of {}) on the {} plan; upgrade your plan for more",
            category.as_str(),
            used,
            limit,
            plan.as_str()
        ),
    )
}

/// Remaining allowance this period; `None` when the category is uncapped.
pub fn remaining(plan: Plan, category: Category, used: i64) -> Option<i64> {
    let limit = limits(plan).limit_for(category);
    if limit == UNLIMITED {
        return None;
    }
    Some((limit - used).max(0))
}

/// Full admission check for one operation: a current subscription plus a
/// ledger count below the plan ceiling.
pub fn guard(
    subscription: Option<&Subscription>,
    category: Category,
    used: i64,
) -> Result<(), AppError> {
    let Some(subscription) = subscription else {
        return Err(AppError::SubscriptionInactive(
            "No subscription on file".to_string(),
        ));
    };
    if !subscription.is_current() {
        return Err(AppError::SubscriptionInactive(format!(
            "Subscription is {}",
            subscription.status
        )));
    }

    let (allowed, reason) = can_generate(subscription.plan(), category, used);
    if !allowed {
        return Err(AppError::QuotaExceeded {
            category: category.as_str().to_string(),
            message: reason,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn subscription(plan: Plan, status: SubscriptionStatus) -> Subscription {
        let now = Utc::now();
        Subscription {
            subscription_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            plan: plan.as_str().to_string(),
            status: status.as_str().to_string(),
            external_ref: None,
            current_period_start: now,
            current_period_end: now,
            cancel_at_period_end: false,
            last_event_utc: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    #[test]
    fn allows_below_limit_denies_at_limit() {
        // Free hook ceiling is 5.
        assert!(can_generate(Plan::Free, Category::Hook, 4).0);
        let (allowed, reason) = can_generate(Plan::Free, Category::Hook, 5);
        assert!(!allowed);
        assert!(reason.contains("hook"));
        assert!(reason.contains("free"));
        assert!(reason.contains("upgrade your plan"));
    }

    #[test]
    fn unlimited_plan_never_denies() {
        let (allowed, reason) = can_generate(Plan::Enterprise, Category::Script, 100_000);
        assert!(allowed);
        assert!(reason.is_empty());
    }

    #[test]
    fn remaining_saturates_at_zero() {
        assert_eq!(remaining(Plan::Free, Category::Hook, 0), Some(5));
        assert_eq!(remaining(Plan::Free, Category::Hook, 7), Some(0));
        assert_eq!(remaining(Plan::Enterprise, Category::Hook, 7), None);
    }

    #[test]
    fn guard_requires_current_subscription() {
        let err = guard(None, Category::Hook, 0).unwrap_err();
        assert!(matches!(err, AppError::SubscriptionInactive(_)));

        let canceled = subscription(Plan::Pro, SubscriptionStatus::Canceled);
        let err = guard(Some(&canceled), Category::Hook, 0).unwrap_err();
        assert!(matches!(err, AppError::SubscriptionInactive(_)));

        let past_due = subscription(Plan::Pro, SubscriptionStatus::PastDue);
        assert!(guard(Some(&past_due), Category::Hook, 0).is_err());
    }

    #[test]
    fn guard_admits_trialing_subscription() {
        let trialing = subscription(Plan::Basic, SubscriptionStatus::Trialing);
        assert!(guard(Some(&trialing), Category::Caption, 10).is_ok());
    }

    #[test]
    fn guard_maps_ceiling_to_quota_exceeded() {
        let active = subscription(Plan::Free, SubscriptionStatus::Active);
        let err = guard(Some(&active), Category::Export, 2).unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded { .. }));
    }
}
