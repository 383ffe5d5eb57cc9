//! Content provider abstractions and implementations.
//!
//! Trait-based boundary around the AI backend and the export renderer,
//! allowing easy swapping between real and mock implementations.

pub mod claude;
pub mod mock;
pub mod renderer;

use crate::models::{Category, ContentBody};
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Malformed provider output: {0}")]
    MalformedOutput(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// A generation request for one category.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub category: Category,
    /// User topic or niche the content is about.
    pub topic: String,
    pub target_audience: Option<String>,
    pub tone: Option<String>,
}

/// A rendered export document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Trait for content generation backends. Implementations return a typed
/// body; the caller runs structural validation before persisting.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<ContentBody, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Trait for export renderers.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, title: &str, body: &ContentBody) -> Result<RenderedDocument, ProviderError>;
}
