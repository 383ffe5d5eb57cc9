//! Application startup and lifecycle management.

use crate::config::{GeneratorBackend, QuotaConfig, StoreBackend};
use crate::handlers;
use crate::services::billing::WebhookVerifier;
use crate::services::database::Database;
use crate::services::generation::GenerationService;
use crate::services::memory::MemoryStore;
use crate::services::metrics::{get_metrics, init_metrics};
use crate::services::providers::claude::{ClaudeConfig, ClaudeContentGenerator};
use crate::services::providers::mock::MockContentGenerator;
use crate::services::providers::renderer::TextRenderer;
use crate::services::providers::{ContentGenerator, DocumentRenderer};
use crate::services::reconciler::BillingReconciler;
use crate::services::repository::{ContentStore, SubscriptionStore, TenantStore, UsageStore};
use axum::{
    extract::State, http::StatusCode, middleware, response::IntoResponse, routing::get,
    routing::post, Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: QuotaConfig,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub usage: Arc<dyn UsageStore>,
    pub tenants: Arc<dyn TenantStore>,
    pub contents: Arc<dyn ContentStore>,
    pub generation: Arc<GenerationService>,
    pub reconciler: Arc<BillingReconciler>,
    pub verifier: WebhookVerifier,
    /// Present only with the Postgres backend; drives the health probes.
    pub db: Option<Arc<Database>>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = match &state.db {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    if db_ok {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "quota-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        )
    } else {
        tracing::warn!("Health check failed - database unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": "quota-service"
            })),
        )
    }
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match &state.db {
        Some(db) => match db.health_check().await {
            Ok(_) => StatusCode::OK,
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check failed");
                StatusCode::SERVICE_UNAVAILABLE
            }
        },
        None => StatusCode::OK,
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Build the API router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/tenants", post(handlers::create_tenant))
        // POST takes a category name, GET a content id; both bind the same
        // path position so they share one route.
        .route(
            "/api/content/:key",
            post(handlers::generate_content).get(handlers::get_content),
        )
        .route("/api/subscription", get(handlers::subscription_summary))
        .route("/api/export/:content_id", post(handlers::export_content))
        .route("/api/webhooks/billing", post(handlers::billing_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: QuotaConfig) -> Result<Self, AppError> {
        init_metrics();

        let state = build_state(config.clone()).await?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "quota-service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}

/// Wire stores, providers and services from configuration.
pub async fn build_state(config: QuotaConfig) -> Result<AppState, AppError> {
    let (subscriptions, usage, tenants, contents, db): (
        Arc<dyn SubscriptionStore>,
        Arc<dyn UsageStore>,
        Arc<dyn TenantStore>,
        Arc<dyn ContentStore>,
        Option<Arc<Database>>,
    ) = match config.store {
        StoreBackend::Postgres => {
            let db = Database::new(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                e
            })?;
            db.run_migrations().await?;
            let db = Arc::new(db);
            (
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                Some(db),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Running with the in-memory store; state is not durable");
            let store = Arc::new(MemoryStore::new());
            (
                store.clone(),
                store.clone(),
                store.clone(),
                store,
                None,
            )
        }
    };

    let generator: Arc<dyn ContentGenerator> = match config.generator.backend {
        GeneratorBackend::Claude => Arc::new(ClaudeContentGenerator::new(ClaudeConfig {
            api_key: config.generator.api_key.clone(),
            model: config.generator.model.clone(),
            max_tokens: config.generator.max_tokens,
        })),
        GeneratorBackend::Mock => Arc::new(MockContentGenerator::new(true)),
    };
    let renderer: Arc<dyn DocumentRenderer> = Arc::new(TextRenderer::new());

    let generation = Arc::new(GenerationService::new(
        subscriptions.clone(),
        usage.clone(),
        contents.clone(),
        generator,
        renderer,
    ));
    let reconciler = Arc::new(BillingReconciler::new(
        subscriptions.clone(),
        tenants.clone(),
    ));
    let verifier = WebhookVerifier::new(
        config.webhook.secret.clone(),
        config.webhook.tolerance_secs,
    );

    Ok(AppState {
        config,
        subscriptions,
        usage,
        tenants,
        contents,
        generation,
        reconciler,
        verifier,
        db,
    })
}
