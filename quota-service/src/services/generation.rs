//! Generation and export pipeline.
//!
//! One orchestrated path for every metered operation: advisory guard read,
//! external generation, structural validation, then the ledger's atomic
//! check-and-consume as the enforcement point. A failed generation never
//! consumes quota, and a lost consume race never returns content.

use crate::models::{
    Category, ContentRecord, ContentStatus, CreateContent, Subscription, UsagePeriod, limits,
    UNLIMITED,
};
use crate::services::metrics::{
    record_error, record_export, record_generation, record_quota_decision,
};
use crate::services::providers::{
    ContentGenerator, ContentRequest, DocumentRenderer, ProviderError, RenderedDocument,
};
use crate::services::quota;
use crate::services::repository::{ContentStore, SubscriptionStore, UsageStore};
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

fn provider_failure(error: ProviderError) -> AppError {
    match error {
        ProviderError::InvalidRequest(message) => AppError::BadRequest(anyhow::anyhow!(message)),
        other => AppError::UpstreamFailure(anyhow::anyhow!(other)),
    }
}

pub struct GenerationService {
    subscriptions: Arc<dyn SubscriptionStore>,
    usage: Arc<dyn UsageStore>,
    contents: Arc<dyn ContentStore>,
    generator: Arc<dyn ContentGenerator>,
    renderer: Arc<dyn DocumentRenderer>,
}

impl GenerationService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        usage: Arc<dyn UsageStore>,
        contents: Arc<dyn ContentStore>,
        generator: Arc<dyn ContentGenerator>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            subscriptions,
            usage,
            contents,
            generator,
            renderer,
        }
    }

    /// Admission check for one operation. The period comes from the caller so
    /// the guard read and the later consume share a wall-clock snapshot.
    async fn admit(
        &self,
        tenant_id: Uuid,
        category: Category,
        period: UsagePeriod,
    ) -> Result<Subscription, AppError> {
        let subscription = self.subscriptions.get_by_tenant(tenant_id).await?;
        let used = self.usage.current_count(tenant_id, category, period).await?;

        if let Err(denial) = quota::guard(subscription.as_ref(), category, used) {
            record_quota_decision(&tenant_id.to_string(), category.as_str(), "denied");
            return Err(denial);
        }

        // admit() only runs with a present subscription past this point
        subscription.ok_or_else(|| {
            AppError::SubscriptionInactive("No subscription on file".to_string())
        })
    }

    /// Consume one unit, or fail closed when the ceiling was reached by a
    /// concurrent request between the advisory read and now.
    async fn consume(
        &self,
        subscription: &Subscription,
        category: Category,
        period: UsagePeriod,
    ) -> Result<(), AppError> {
        let limit = limits(subscription.plan()).limit_for(category);
        let consumed = if limit == UNLIMITED {
            Some(
                self.usage
                    .increment(subscription.tenant_id, category, period)
                    .await?,
            )
        } else {
            self.usage
                .try_consume(subscription.tenant_id, category, period, limit)
                .await?
        };

        match consumed {
            Some(count) => {
                record_quota_decision(
                    &subscription.tenant_id.to_string(),
                    category.as_str(),
                    "allowed",
                );
                info!(count = count, category = %category.as_str(), "Quota consumed");
                Ok(())
            }
            None => {
                warn!(category = %category.as_str(), "Lost consume race at the ceiling");
                record_quota_decision(
                    &subscription.tenant_id.to_string(),
                    category.as_str(),
                    "denied",
                );
                Err(AppError::QuotaExceeded {
                    category: category.as_str().to_string(),
                    message: format!(
                        "Monthly {} limit reached on the {} plan; upgrade your plan for more",
                        category.as_str(),
                        subscription.plan().as_str()
                    ),
                })
            }
        }
    }

    /// Generate content of one category for a tenant.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, category = %request.category.as_str()))]
    pub async fn generate(
        &self,
        tenant_id: Uuid,
        request: &ContentRequest,
    ) -> Result<ContentRecord, AppError> {
        let category = request.category;
        if category == Category::Export {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "export is not a generation category"
            )));
        }

        let period = UsagePeriod::current();
        let subscription = self.admit(tenant_id, category, period).await?;

        let body = match self.generator.generate(request).await {
            Ok(body) => body,
            Err(error) => {
                record_generation(&tenant_id.to_string(), category.as_str(), "failed");
                record_error("generator");
                return Err(provider_failure(error));
            }
        };

        // Structural failures are generation failures, never auto-corrected.
        if let Err(error) = body.validate() {
            record_generation(&tenant_id.to_string(), category.as_str(), "invalid");
            return Err(AppError::UpstreamFailure(anyhow::anyhow!(
                "generated {} failed validation: {}",
                category.as_str(),
                error
            )));
        }

        self.consume(&subscription, category, period).await?;

        let record = self
            .contents
            .create_content(&CreateContent {
                tenant_id,
                category,
                status: ContentStatus::Completed,
                body,
                prompt: request.topic.clone(),
            })
            .await?;

        record_generation(&tenant_id.to_string(), category.as_str(), "completed");
        info!(content_id = %record.content_id, "Content generated");

        Ok(record)
    }

    /// Export a stored content record as a downloadable document.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, content_id = %content_id))]
    pub async fn export(
        &self,
        tenant_id: Uuid,
        content_id: Uuid,
    ) -> Result<RenderedDocument, AppError> {
        let period = UsagePeriod::current();
        let subscription = self.admit(tenant_id, Category::Export, period).await?;

        // Tenant-scoped lookup; foreign content ids read as absent.
        let record = self
            .contents
            .get_content(tenant_id, content_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Content not found")))?;

        let body = record.body().map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("stored body failed to decode: {}", e))
        })?;

        let document = self
            .renderer
            .render(&record.prompt, &body)
            .map_err(provider_failure)?;

        self.consume(&subscription, Category::Export, period).await?;

        record_export(&tenant_id.to_string(), "completed");

        Ok(document)
    }
}
