//! Database service for quota-service.

use crate::models::{
    Category, ContentRecord, CreateContent, CreateSubscription, CreateTenant, Plan, Subscription,
    SubscriptionChange, Tenant, UsagePeriod,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::repository::{ContentStore, SubscriptionStore, TenantStore, UsageStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "quota-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    async fn create_subscription(
        &self,
        input: &CreateSubscription,
    ) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_subscription"])
            .start_timer();

        let subscription_id = Uuid::new_v4();
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (subscription_id, tenant_id, plan, status, external_ref, current_period_start, current_period_end, cancel_at_period_end, last_event_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING subscription_id, tenant_id, plan, status, external_ref, current_period_start, current_period_end, cancel_at_period_end, last_event_utc, created_utc, updated_utc
            "#,
        )
        .bind(subscription_id)
        .bind(input.tenant_id)
        .bind(input.plan.as_str())
        .bind(input.status.as_str())
        .bind(&input.external_ref)
        .bind(input.current_period_start)
        .bind(input.current_period_end)
        .bind(input.cancel_at_period_end)
        .bind(input.last_event_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                // Duplicate external ref or a second current subscription for
                // the tenant; both are creation conflicts.
                AppError::Conflict(anyhow::anyhow!("Subscription already exists"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create subscription: {}", e)),
        })?;

        timer.observe_duration();
        info!(subscription_id = %subscription.subscription_id, "Subscription created");

        Ok(subscription)
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    async fn upsert_for_tenant(
        &self,
        input: &CreateSubscription,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_subscription_for_tenant"])
            .start_timer();

        // One row per tenant; the ordering gate in the conflict arm drops
        // stale provider state, including replays of the same event.
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (subscription_id, tenant_id, plan, status, external_ref, current_period_start, current_period_end, cancel_at_period_end, last_event_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tenant_id) DO UPDATE
            SET plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                external_ref = EXCLUDED.external_ref,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                last_event_utc = EXCLUDED.last_event_utc,
                updated_utc = now()
            WHERE subscriptions.last_event_utc IS NULL
               OR subscriptions.last_event_utc < EXCLUDED.last_event_utc
            RETURNING subscription_id, tenant_id, plan, status, external_ref, current_period_start, current_period_end, cancel_at_period_end, last_event_utc, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.tenant_id)
        .bind(input.plan.as_str())
        .bind(input.status.as_str())
        .bind(&input.external_ref)
        .bind(input.current_period_start)
        .bind(input.current_period_end)
        .bind(input.cancel_at_period_end)
        .bind(input.last_event_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to upsert subscription: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn get_by_tenant(&self, tenant_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription_by_tenant"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, tenant_id, plan, status, external_ref, current_period_start, current_period_end, cancel_at_period_end, last_event_utc, created_utc, updated_utc
            FROM subscriptions
            WHERE tenant_id = $1
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e)))?;

        timer.observe_duration();

        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn get_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription_by_external_ref"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, tenant_id, plan, status, external_ref, current_period_start, current_period_end, cancel_at_period_end, last_event_utc, created_utc, updated_utc
            FROM subscriptions
            WHERE external_ref = $1
            "#,
        )
        .bind(external_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e)))?;

        timer.observe_duration();

        Ok(subscription)
    }

    #[instrument(skip(self, change), fields(external_ref = %external_ref, event_utc = %event_utc))]
    async fn apply_event_change(
        &self,
        external_ref: &str,
        change: &SubscriptionChange,
        event_utc: DateTime<Utc>,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_event_change"])
            .start_timer();

        // The ordering gate lives in the WHERE clause so concurrent
        // deliveries cannot interleave between a read and a write.
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET plan = COALESCE($2, plan),
                status = COALESCE($3, status),
                current_period_start = COALESCE($4, current_period_start),
                current_period_end = COALESCE($5, current_period_end),
                cancel_at_period_end = COALESCE($6, cancel_at_period_end),
                last_event_utc = $7,
                updated_utc = now()
            WHERE external_ref = $1
              AND (last_event_utc IS NULL OR last_event_utc < $7)
            RETURNING subscription_id, tenant_id, plan, status, external_ref, current_period_start, current_period_end, cancel_at_period_end, last_event_utc, created_utc, updated_utc
            "#,
        )
        .bind(external_ref)
        .bind(change.plan.map(|p| p.as_str()))
        .bind(change.status.map(|s| s.as_str()))
        .bind(change.current_period_start)
        .bind(change.current_period_end)
        .bind(change.cancel_at_period_end)
        .bind(event_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to apply event change: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }
}

#[async_trait]
impl UsageStore for Database {
    #[instrument(skip(self, period), fields(tenant_id = %tenant_id, category = %category.as_str()))]
    async fn current_count(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["current_count"])
            .start_timer();

        let count: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT count
            FROM usage_counters
            WHERE tenant_id = $1 AND category = $2 AND period_start = $3 AND period_end = $4
            "#,
        )
        .bind(tenant_id)
        .bind(category.as_str())
        .bind(period.start)
        .bind(period.end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to read usage: {}", e)))?;

        timer.observe_duration();

        Ok(count.unwrap_or(0))
    }

    #[instrument(skip(self, period), fields(tenant_id = %tenant_id, category = %category.as_str()))]
    async fn increment(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["increment_usage"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO usage_counters (tenant_id, category, period_start, period_end, count)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (tenant_id, category, period_start, period_end)
            DO UPDATE SET count = usage_counters.count + 1, updated_utc = now()
            RETURNING count
            "#,
        )
        .bind(tenant_id)
        .bind(category.as_str())
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to increment usage: {}", e)))?;

        timer.observe_duration();

        Ok(count)
    }

    #[instrument(skip(self, period), fields(tenant_id = %tenant_id, category = %category.as_str(), limit = limit))]
    async fn try_consume(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
        limit: i64,
    ) -> Result<Option<i64>, AppError> {
        if limit <= 0 {
            return Ok(None);
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["try_consume_usage"])
            .start_timer();

        // Single conditional upsert: the increment succeeds only while the
        // pre-increment count is below the limit, so concurrent callers can
        // never overshoot the ceiling.
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO usage_counters (tenant_id, category, period_start, period_end, count)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (tenant_id, category, period_start, period_end)
            DO UPDATE SET count = usage_counters.count + 1, updated_utc = now()
            WHERE usage_counters.count < $5
            RETURNING count
            "#,
        )
        .bind(tenant_id)
        .bind(category.as_str())
        .bind(period.start)
        .bind(period.end)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to consume quota: {}", e)))?;

        timer.observe_duration();

        Ok(count)
    }
}

#[async_trait]
impl TenantStore for Database {
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    async fn create_tenant(&self, input: &CreateTenant) -> Result<Tenant, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_tenant"])
            .start_timer();

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (tenant_id, name, plan)
            VALUES ($1, $2, 'free')
            RETURNING tenant_id, name, plan, created_utc, updated_utc
            "#,
        )
        .bind(input.tenant_id)
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Tenant already exists"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create tenant: {}", e)),
        })?;

        timer.observe_duration();
        info!(tenant_id = %tenant.tenant_id, "Tenant created");

        Ok(tenant)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_tenant"])
            .start_timer();

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT tenant_id, name, plan, created_utc, updated_utc
            FROM tenants
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get tenant: {}", e)))?;

        timer.observe_duration();

        Ok(tenant)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, plan = %plan.as_str()))]
    async fn set_tenant_plan(&self, tenant_id: Uuid, plan: Plan) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_tenant_plan"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE tenants
            SET plan = $2, updated_utc = now()
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(plan.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to set tenant plan: {}", e)))?;

        timer.observe_duration();

        Ok(())
    }
}

#[async_trait]
impl ContentStore for Database {
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, category = %input.category.as_str()))]
    async fn create_content(&self, input: &CreateContent) -> Result<ContentRecord, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_content"])
            .start_timer();

        let content_id = Uuid::new_v4();
        let body = serde_json::to_value(&input.body).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to serialize content body: {}", e))
        })?;

        let record = sqlx::query_as::<_, ContentRecord>(
            r#"
            INSERT INTO contents (content_id, tenant_id, category, status, body, prompt, version)
            VALUES ($1, $2, $3, $4, $5, $6, 1)
            RETURNING content_id, tenant_id, category, status, body, prompt, version, created_utc, updated_utc
            "#,
        )
        .bind(content_id)
        .bind(input.tenant_id)
        .bind(input.category.as_str())
        .bind(input.status.as_str())
        .bind(&body)
        .bind(&input.prompt)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create content: {}", e)))?;

        timer.observe_duration();

        Ok(record)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, content_id = %content_id))]
    async fn get_content(
        &self,
        tenant_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<ContentRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_content"])
            .start_timer();

        let record = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT content_id, tenant_id, category, status, body, prompt, version, created_utc, updated_utc
            FROM contents
            WHERE tenant_id = $1 AND content_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get content: {}", e)))?;

        timer.observe_duration();

        Ok(record)
    }
}
