//! Shared test harness: memory-backed application state plus signing helpers.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use quota_service::config::{
    DatabaseConfig, GeneratorBackend, GeneratorConfig, QuotaConfig, StoreBackend, WebhookConfig,
};
use quota_service::models::{CreateSubscription, CreateTenant, Plan, SubscriptionStatus};
use quota_service::startup::{build_state, AppState};
use service_core::utils::signature::generate_signature;
use uuid::Uuid;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

pub fn test_config() -> QuotaConfig {
    QuotaConfig {
        common: service_core::config::Config { port: 0 },
        service_name: "quota-service".to_string(),
        log_level: "info".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        generator: GeneratorConfig {
            backend: GeneratorBackend::Mock,
            api_key: String::new(),
            model: "test-model".to_string(),
            max_tokens: 1024,
        },
        webhook: WebhookConfig {
            secret: TEST_WEBHOOK_SECRET.to_string(),
            tolerance_secs: 300,
        },
    }
}

/// Memory-backed application state with the mock generator.
pub async fn test_state() -> AppState {
    build_state(test_config())
        .await
        .expect("Failed to build test state")
}

/// Onboard a tenant the way the handler does: tenant row plus an active
/// free subscription.
pub async fn onboard_tenant(state: &AppState, name: &str) -> Uuid {
    let tenant_id = Uuid::new_v4();
    state
        .tenants
        .create_tenant(&CreateTenant {
            tenant_id,
            name: name.to_string(),
        })
        .await
        .expect("Failed to create tenant");

    let now = Utc::now();
    state
        .subscriptions
        .create_subscription(&CreateSubscription {
            tenant_id,
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            external_ref: None,
            current_period_start: now,
            current_period_end: now + Duration::days(30),
            cancel_at_period_end: false,
            last_event_utc: None,
        })
        .await
        .expect("Failed to create subscription");

    tenant_id
}

/// Onboard a tenant already on a paid plan with a provider-backed
/// subscription, as if a created event had been applied.
pub async fn onboard_paid_tenant(
    state: &AppState,
    name: &str,
    plan: Plan,
    external_ref: &str,
) -> Uuid {
    let tenant_id = onboard_tenant(state, name).await;

    let now = Utc::now();
    state
        .subscriptions
        .upsert_for_tenant(&CreateSubscription {
            tenant_id,
            plan,
            status: SubscriptionStatus::Active,
            external_ref: Some(external_ref.to_string()),
            current_period_start: now,
            current_period_end: now + Duration::days(30),
            cancel_at_period_end: false,
            last_event_utc: Some(now - Duration::hours(1)),
        })
        .await
        .expect("Failed to upgrade subscription")
        .expect("Upgrade unexpectedly stale");
    state
        .tenants
        .set_tenant_plan(tenant_id, plan)
        .await
        .expect("Failed to mirror plan");

    tenant_id
}

/// Build a `t=...,v1=...` signature header for a webhook payload.
pub fn sign_payload(timestamp: i64, payload: &[u8]) -> String {
    let signature = generate_signature(TEST_WEBHOOK_SECRET, timestamp, payload)
        .expect("Failed to sign payload");
    format!("t={},v1={}", timestamp, signature)
}
