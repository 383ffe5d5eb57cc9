//! HTTP-level tests: webhook boundary and the tenant-facing API surface.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use common::{onboard_tenant, sign_payload, test_state};
use http_body_util::BodyExt;
use quota_service::startup::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn created_event_payload(tenant_id: Uuid, external_ref: &str, plan: &str) -> Vec<u8> {
    let now = Utc::now();
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", Uuid::new_v4()),
        "type": "customer.subscription.created",
        "created": now.timestamp(),
        "data": {
            "object": {
                "id": external_ref,
                "status": "active",
                "current_period_start": now.timestamp(),
                "current_period_end": (now + Duration::days(30)).timestamp(),
                "cancel_at_period_end": false,
                "metadata": {
                    "tenant_id": tenant_id.to_string(),
                    "plan": plan
                }
            }
        }
    }))
    .unwrap()
}

fn webhook_request(payload: &[u8], signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/billing")
        .header(header::CONTENT_TYPE, "application/json")
        .header("Billing-Signature", signature)
        .body(Body::from(payload.to_vec()))
        .unwrap()
}

async fn tenant_plan(state: &AppState, tenant_id: Uuid) -> String {
    state
        .tenants
        .get_tenant(tenant_id)
        .await
        .unwrap()
        .unwrap()
        .plan
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "unsigned").await;
    let router = build_router(state.clone());

    let payload = created_event_payload(tenant_id, "sub_unsigned", "pro");
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/billing")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .unwrap();

    let (status, _) = send(router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(tenant_plan(&state, tenant_id).await, "free");
}

#[tokio::test]
async fn webhook_with_tampered_payload_mutates_nothing() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "tampered").await;
    let router = build_router(state.clone());

    let payload = created_event_payload(tenant_id, "sub_tampered", "pro");
    // Signature computed over different bytes.
    let signature = sign_payload(Utc::now().timestamp(), b"something else");

    let (status, _) = send(router, webhook_request(&payload, &signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(tenant_plan(&state, tenant_id).await, "free");
}

#[tokio::test]
async fn webhook_with_stale_timestamp_is_rejected() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "replayed").await;
    let router = build_router(state.clone());

    let payload = created_event_payload(tenant_id, "sub_replayed", "pro");
    let signature = sign_payload(Utc::now().timestamp() - 3600, &payload);

    let (status, _) = send(router, webhook_request(&payload, &signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(tenant_plan(&state, tenant_id).await, "free");
}

#[tokio::test]
async fn signed_created_event_upgrades_the_tenant() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "paying").await;
    let router = build_router(state.clone());

    let payload = created_event_payload(tenant_id, "sub_paying", "pro");
    let signature = sign_payload(Utc::now().timestamp(), &payload);

    let (status, body) = send(router, webhook_request(&payload, &signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "created");
    assert_eq!(tenant_plan(&state, tenant_id).await, "pro");
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged() {
    let state = test_state().await;
    let router = build_router(state);

    let payload = serde_json::to_vec(&json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "created": Utc::now().timestamp(),
        "data": {"object": {}}
    }))
    .unwrap();
    let signature = sign_payload(Utc::now().timestamp(), &payload);

    let (status, body) = send(router, webhook_request(&payload, &signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unhandled");
}

#[tokio::test]
async fn api_flow_onboards_generates_and_reports_usage() {
    let state = test_state().await;
    let router = build_router(state);

    let (status, body) = send(
        router.clone(),
        Request::builder()
            .method("POST")
            .uri("/api/tenants")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"studio"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["plan"], "free");
    let tenant_id = body["tenant_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        router.clone(),
        Request::builder()
            .method("POST")
            .uri("/api/content/hook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Tenant-ID", &tenant_id)
            .body(Body::from(r#"{"topic":"morning routines"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["category"], "hook");
    assert_eq!(body["status"], "completed");
    let content_id = body["content_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        router.clone(),
        Request::builder()
            .method("GET")
            .uri(format!("/api/content/{}", content_id))
            .header("X-Tenant-ID", &tenant_id)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content_id"], content_id.as_str());

    let (status, body) = send(
        router.clone(),
        Request::builder()
            .method("GET")
            .uri("/api/subscription")
            .header("X-Tenant-ID", &tenant_id)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hook_usage = body["usage"]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["category"] == "hook")
        .unwrap();
    assert_eq!(hook_usage["used"], 1);

    // Metered routes require the tenant header.
    let (status, _) = send(
        router,
        Request::builder()
            .method("POST")
            .uri("/api/content/hook")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"topic":"no tenant"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_category_is_rejected() {
    let state = test_state().await;
    let tenant_id = onboard_tenant(&state, "curious").await;
    let router = build_router(state);

    let (status, _) = send(
        router,
        Request::builder()
            .method("POST")
            .uri("/api/content/podcast")
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Tenant-ID", tenant_id.to_string())
            .body(Body::from(r#"{"topic":"anything"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
