//! External enrichment capability (§4.8 step 4).
//!
//! The write pipeline calls out to this trait with the merged
//! `(title, description, content)` text and expects back a summary,
//! weighted keywords, weighted concepts, and a dense embedding — all
//! optional. A failing or slow provider must never block a write: the
//! pipeline wraps the call in a timeout and treats any error the same way
//! it treats a timeout (§5, §4.8).

use async_trait::async_trait;

/// Output of one enrichment call. Every field is optional; absent fields
/// leave prior values unchanged on update, or null on create (§4.8 step 4).
#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutput {
    pub summary: Option<String>,
    pub keywords: Vec<(String, f32)>,
    pub concepts: Vec<(String, f32)>,
    pub embedding: Option<Vec<f32>>,
}

/// The external enrichment capability. Implementations might call a local
/// model, a remote API, or (in tests and the default offline mode) do
/// nothing at all.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn enrich(&self, text: &str) -> Result<EnrichmentOutput, EnrichmentError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichmentError {
    #[error("enrichment provider unavailable: {0}")]
    Unavailable(String),
}

/// No-op provider: every call succeeds immediately with an empty output.
/// Used as the default when no richer provider is configured, and in tests
/// that need a predictable, instant enrichment step.
pub struct NullEnrichmentProvider;

#[async_trait]
impl EnrichmentProvider for NullEnrichmentProvider {
    async fn enrich(&self, _text: &str) -> Result<EnrichmentOutput, EnrichmentError> {
        Ok(EnrichmentOutput::default())
    }
}

/// A provider that always fails, for exercising P8 (enrichment-optional).
#[cfg(any(test, feature = "test-util"))]
pub struct AlwaysFailingProvider;

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl EnrichmentProvider for AlwaysFailingProvider {
    async fn enrich(&self, _text: &str) -> Result<EnrichmentOutput, EnrichmentError> {
        Err(EnrichmentError::Unavailable("simulated failure".into()))
    }
}
