//! Generation and export pipeline tests against the in-memory store.

mod common;

use chrono::{Duration, Utc};
use common::{onboard_paid_tenant, onboard_tenant, test_state};
use quota_service::models::{
    Category, CreateSubscription, CreateTenant, Plan, SubscriptionStatus, UsagePeriod,
};
use quota_service::services::generation::GenerationService;
use quota_service::services::memory::MemoryStore;
use quota_service::services::providers::mock::MockContentGenerator;
use quota_service::services::providers::renderer::TextRenderer;
use quota_service::services::providers::ContentRequest;
use quota_service::services::repository::{SubscriptionStore, TenantStore, UsageStore};
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

fn hook_request(topic: &str) -> ContentRequest {
    ContentRequest {
        category: Category::Hook,
        topic: topic.to_string(),
        target_audience: Some("indie developers".to_string()),
        tone: None,
    }
}

#[tokio::test]
async fn successful_generation_persists_and_consumes_one_unit() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "maker").await;
    let period = UsagePeriod::current();

    let record = state
        .generation
        .generate(tenant_id, &hook_request("launch week"))
        .await
        .unwrap();

    assert_eq!(record.tenant_id, tenant_id);
    assert_eq!(record.category, "hook");
    assert_eq!(record.status, "completed");
    record.body().unwrap();

    let used = state
        .usage
        .current_count(tenant_id, Category::Hook, period)
        .await
        .unwrap();
    assert_eq!(used, 1);

    let stored = state
        .contents
        .get_content(tenant_id, record.content_id)
        .await
        .unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn failed_generation_consumes_no_quota() {
    let store = Arc::new(MemoryStore::new());
    let service = GenerationService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(MockContentGenerator::new(false)),
        Arc::new(TextRenderer::new()),
    );

    let tenant_id = Uuid::new_v4();
    store
        .create_tenant(&CreateTenant {
            tenant_id,
            name: "unlucky".to_string(),
        })
        .await
        .unwrap();
    let now = Utc::now();
    store
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
        .unwrap();

    let err = service
        .generate(tenant_id, &hook_request("doomed"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UpstreamFailure(_)));

    let used = store
        .current_count(tenant_id, Category::Hook, UsagePeriod::current())
        .await
        .unwrap();
    assert_eq!(used, 0);
}

#[tokio::test]
async fn free_plan_hook_ceiling_is_enforced() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "prolific").await;

    for i in 0..5 {
        state
            .generation
            .generate(tenant_id, &hook_request(&format!("topic {}", i)))
            .await
            .unwrap();
    }

    let err = state
        .generation
        .generate(tenant_id, &hook_request("one too many"))
        .await
        .unwrap_err();
    match err {
        AppError::QuotaExceeded { category, message } => {
            assert_eq!(category, "hook");
            assert!(message.contains("upgrade your plan"));
        }
        other => panic!("expected a quota denial, got {:?}", other),
    }

    // Other categories are unaffected by the exhausted one.
    state
        .generation
        .generate(
            tenant_id,
            &ContentRequest {
                category: Category::Caption,
                topic: "still fine".to_string(),
                target_audience: None,
                tone: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn pro_plan_outlasts_the_free_ceiling() {
    let state = test_state().await;
    let tenant_id = onboard_paid_tenant(&state, "scaler", Plan::Pro, "sub_scale").await;

    for i in 0..6 {
        state
            .generation
            .generate(tenant_id, &hook_request(&format!("topic {}", i)))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn tenant_without_subscription_is_rejected() {
    let state = test_state().await;
    let tenant_id = Uuid::new_v4();
    state
        .tenants
        .create_tenant(&CreateTenant {
            tenant_id,
            name: "ghost".to_string(),
        })
        .await
        .unwrap();

    let err = state
        .generation
        .generate(tenant_id, &hook_request("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SubscriptionInactive(_)));
}

#[tokio::test]
async fn export_is_not_a_generation_category() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "confused").await;

    let err = state
        .generation
        .generate(
            tenant_id,
            &ContentRequest {
                category: Category::Export,
                topic: "irrelevant".to_string(),
                target_audience: None,
                tone: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn export_renders_and_consumes_export_quota() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "exporter").await;
    let period = UsagePeriod::current();

    let record = state
        .generation
        .generate(tenant_id, &hook_request("exportable"))
        .await
        .unwrap();

    let document = state
        .generation
        .export(tenant_id, record.content_id)
        .await
        .unwrap();
    assert_eq!(document.mime_type, "text/plain; charset=utf-8");
    assert!(!document.bytes.is_empty());

    let exports = state
        .usage
        .current_count(tenant_id, Category::Export, period)
        .await
        .unwrap();
    assert_eq!(exports, 1);

    // Hook usage stays at the single generation.
    let hooks = state
        .usage
        .current_count(tenant_id, Category::Hook, period)
        .await
        .unwrap();
    assert_eq!(hooks, 1);
}

#[tokio::test]
async fn export_cannot_reach_another_tenants_content() {
    let state = test_state().await;
    let owner = onboard_tenant(&state, "owner").await;
    let intruder = onboard_tenant(&state, "intruder").await;

    let record = state
        .generation
        .generate(owner, &hook_request("private"))
        .await
        .unwrap();

    let err = state
        .generation
        .export(intruder, record.content_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let exports = state
        .usage
        .current_count(intruder, Category::Export, UsagePeriod::current())
        .await
        .unwrap();
    assert_eq!(exports, 0);
}
