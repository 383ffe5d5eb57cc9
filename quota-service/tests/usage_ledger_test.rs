//! Usage ledger tests: counter semantics and atomic check-and-consume.

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{onboard_tenant, test_state};
use quota_service::models::{Category, UsagePeriod};
use uuid::Uuid;

#[tokio::test]
async fn count_defaults_to_zero_without_a_row() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "fresh").await;

    let count = state
        .usage
        .current_count(tenant_id, Category::Hook, UsagePeriod::current())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn increment_creates_then_counts_up() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "counting").await;
    let period = UsagePeriod::current();

    assert_eq!(
        state
            .usage
            .increment(tenant_id, Category::Script, period)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        state
            .usage
            .increment(tenant_id, Category::Script, period)
            .await
            .unwrap(),
        2
    );

    // Other categories and tenants are untouched.
    assert_eq!(
        state
            .usage
            .current_count(tenant_id, Category::Caption, period)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        state
            .usage
            .current_count(Uuid::new_v4(), Category::Script, period)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn concurrent_increments_lose_no_updates() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "concurrent").await;
    let period = UsagePeriod::current();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let usage = state.usage.clone();
        handles.push(tokio::spawn(async move {
            usage
                .increment(tenant_id, Category::Broll, period)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let count = state
        .usage
        .current_count(tenant_id, Category::Broll, period)
        .await
        .unwrap();
    assert_eq!(count, 50);
}

#[tokio::test]
async fn try_consume_stops_exactly_at_the_limit() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "at-limit").await;
    let period = UsagePeriod::current();
    let limit = 5;

    // More contenders than allowance; exactly `limit` may win.
    let mut handles = Vec::new();
    for _ in 0..(limit + 10) {
        let usage = state.usage.clone();
        handles.push(tokio::spawn(async move {
            usage
                .try_consume(tenant_id, Category::Hook, period, limit)
                .await
                .unwrap()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, limit);
    assert_eq!(
        state
            .usage
            .current_count(tenant_id, Category::Hook, period)
            .await
            .unwrap(),
        limit
    );
}

#[tokio::test]
async fn try_consume_denies_once_exhausted() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "exhausted").await;
    let period = UsagePeriod::current();

    for _ in 0..3 {
        assert!(state
            .usage
            .try_consume(tenant_id, Category::Calendar, period, 3)
            .await
            .unwrap()
            .is_some());
    }
    assert!(state
        .usage
        .try_consume(tenant_id, Category::Calendar, period, 3)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn periods_key_counters_independently() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "periods").await;

    let january = UsagePeriod::containing(Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());
    let february = UsagePeriod::containing(january.end + Duration::seconds(1));
    assert_ne!(january, february);

    state
        .usage
        .increment(tenant_id, Category::Hook, january)
        .await
        .unwrap();

    assert_eq!(
        state
            .usage
            .current_count(tenant_id, Category::Hook, february)
            .await
            .unwrap(),
        0
    );
}
