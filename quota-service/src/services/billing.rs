//! Billing webhook boundary.
//!
//! Verifies provider signatures and parses raw webhook payloads into typed
//! `BillingEvent`s. Nothing past this module ever sees an unverified byte.
//!
//! The signature header carries a unix timestamp and a hex HMAC-SHA256 over
//! `"{timestamp}.{payload}"`: `t=<unix>,v1=<hex>`.

use crate::models::{BillingEvent, BillingEventType, Plan};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use service_core::error::AppError;
use service_core::utils::signature::verify_signature;
use uuid::Uuid;

/// Webhook signature verifier with a replay tolerance window.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: String, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    fn parse_header(header: &str) -> Result<(i64, &str), AppError> {
        let mut timestamp = None;
        let mut signature = None;

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        AppError::SignatureInvalid("malformed timestamp".to_string())
                    })?);
                }
                Some(("v1", value)) => signature = Some(value),
                _ => {}
            }
        }

        match (timestamp, signature) {
            (Some(t), Some(v1)) => Ok((t, v1)),
            _ => Err(AppError::SignatureInvalid(
                "signature header missing t= or v1=".to_string(),
            )),
        }
    }

    /// Verify the signature header against the raw payload bytes.
    pub fn verify(
        &self,
        header: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let (timestamp, signature) = Self::parse_header(header)?;

        if (now.timestamp() - timestamp).abs() > self.tolerance_secs {
            return Err(AppError::SignatureInvalid(
                "timestamp outside tolerance window".to_string(),
            ));
        }

        let valid = verify_signature(&self.secret, timestamp, payload, signature)
            .map_err(AppError::InternalError)?;
        if !valid {
            return Err(AppError::SignatureInvalid(
                "signature mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Deserialize)]
struct WebhookObject {
    #[serde(default)]
    id: Option<String>,
    /// Subscription reference on invoice objects.
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    current_period_start: Option<i64>,
    #[serde(default)]
    current_period_end: Option<i64>,
    #[serde(default)]
    cancel_at_period_end: bool,
    #[serde(default)]
    metadata: WebhookMetadata,
}

#[derive(Deserialize, Default)]
struct WebhookMetadata {
    #[serde(default)]
    tenant_id: Option<Uuid>,
    #[serde(default)]
    plan: Option<String>,
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("timestamp out of range: {}", secs)))
}

/// Parse a verified webhook payload into a typed event. Unknown event types
/// parse successfully; the reconciler reports them as not handled.
pub fn parse_event(payload: &[u8]) -> Result<BillingEvent, AppError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(payload)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("malformed webhook payload: {}", e)))?;

    let event_type = BillingEventType::from_string(&envelope.event_type);
    let object = envelope.data.object;

    // Subscription events carry the subscription id on the object itself;
    // invoice events reference it through the subscription field.
    let external_ref = match event_type {
        BillingEventType::InvoicePaid | BillingEventType::InvoicePaymentFailed => {
            object.subscription
        }
        _ => object.id,
    };

    let current_period_start = object
        .current_period_start
        .map(from_unix)
        .transpose()?;
    let current_period_end = object.current_period_end.map(from_unix).transpose()?;

    Ok(BillingEvent {
        event_id: envelope.id,
        event_type,
        external_ref,
        tenant_id: object.metadata.tenant_id,
        plan: object.metadata.plan.as_deref().map(Plan::from_string),
        provider_status: object.status,
        current_period_start,
        current_period_end,
        cancel_at_period_end: object.cancel_at_period_end,
        created_utc: from_unix(envelope.created)?,
    })
}
