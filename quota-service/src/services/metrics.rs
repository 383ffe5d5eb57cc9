//! Metrics module for quota-service.
//! Prometheus metrics for quota decisions, generation and billing events.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!("quota_db_query_duration_seconds", "Database query duration"),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Quota decisions counter (per-tenant metering)
pub static QUOTA_DECISIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Generation attempts counter
pub static GENERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Export attempts counter
pub static EXPORTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billing events counter
pub static BILLING_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    QUOTA_DECISIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "quota_decisions_total",
                "Quota guard decisions by tenant, category and outcome"
            ),
            &["tenant_id", "category", "outcome"]
        )
        .expect("Failed to register QUOTA_DECISIONS_TOTAL")
    });

    GENERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "quota_generations_total",
                "Content generations by tenant, category and status"
            ),
            &["tenant_id", "category", "status"]
        )
        .expect("Failed to register GENERATIONS_TOTAL")
    });

    EXPORTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("quota_exports_total", "Document exports by tenant and status"),
            &["tenant_id", "status"]
        )
        .expect("Failed to register EXPORTS_TOTAL")
    });

    BILLING_EVENTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "quota_billing_events_total",
                "Billing events by type and reconcile outcome"
            ),
            &["event_type", "outcome"]
        )
        .expect("Failed to register BILLING_EVENTS_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("quota_errors_total", "Errors by component"),
            &["component"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });
}

/// Render all registered metrics in the Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_quota_decision(tenant_id: &str, category: &str, outcome: &str) {
    if let Some(counter) = QUOTA_DECISIONS_TOTAL.get() {
        counter
            .with_label_values(&[tenant_id, category, outcome])
            .inc();
    }
}

pub fn record_generation(tenant_id: &str, category: &str, status: &str) {
    if let Some(counter) = GENERATIONS_TOTAL.get() {
        counter
            .with_label_values(&[tenant_id, category, status])
            .inc();
    }
}

pub fn record_export(tenant_id: &str, status: &str) {
    if let Some(counter) = EXPORTS_TOTAL.get() {
        counter.with_label_values(&[tenant_id, status]).inc();
    }
}

pub fn record_billing_event(event_type: &str, outcome: &str) {
    if let Some(counter) = BILLING_EVENTS_TOTAL.get() {
        counter.with_label_values(&[event_type, outcome]).inc();
    }
}

pub fn record_error(component: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[component]).inc();
    }
}
