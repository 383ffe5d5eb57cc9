//! Billing webhook handler.

use axum::{
    body::Bytes,
    extract::{Json, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::Serialize;

use crate::services::billing;
use crate::services::reconciler::ReconcileOutcome;
use crate::startup::AppState;
use service_core::error::AppError;

pub const SIGNATURE_HEADER: &str = "Billing-Signature";

/// Acknowledgement returned to the billing provider.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub event_id: String,
    pub event_type: String,
    pub outcome: ReconcileOutcome,
}

/// Process one billing provider event.
///
/// POST /api/webhooks/billing
///
/// The signature is checked against the raw bytes before anything is parsed;
/// a bad signature rejects the request with no state touched.
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::SignatureInvalid("Missing Billing-Signature header".to_string())
        })?;

    state.verifier.verify(signature, &body, Utc::now())?;

    let event = billing::parse_event(&body)?;
    let outcome = state.reconciler.apply(&event).await?;

    Ok(Json(WebhookResponse {
        event_id: event.event_id,
        event_type: event.event_type.as_str().to_string(),
        outcome,
    }))
}
