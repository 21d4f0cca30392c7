use crate::application::Verdict;
use crate::domain::KtpFields;
use async_trait::async_trait;

/// Result of an enrichment pass over the extracted text.
#[derive(Debug, Clone)]
pub struct AiAnalysis {
    pub verdict: Verdict,
    pub fields: KtpFields,
}

/// Alternate/supplementary verdict source, e.g. an AI-assisted analyzer.
///
/// Selected at lifecycle-manager construction time; the default is a no-op.
/// When a strategy returns a result it is logged side by side with the local
/// parse, never in place of it.
#[async_trait]
pub trait Enrichment: Send + Sync {
    async fn analyze(&self, ocr_text: &str) -> Option<AiAnalysis>;
}

/// Default strategy: no enrichment configured.
pub struct NoopEnrichment;

#[async_trait]
impl Enrichment for NoopEnrichment {
    async fn analyze(&self, _ocr_text: &str) -> Option<AiAnalysis> {
        None
    }
}
