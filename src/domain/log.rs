use crate::domain::KtpFields;
use serde::{Deserialize, Serialize};

/// One append-only audit record per verification pass over a document.
///
/// Entries are immutable once written; `created_at` ordering is what the
/// audit reconstruction relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationLogEntry {
    pub id: String,
    pub document_id: String,
    pub ocr_text: String,
    pub parsed_fields: KtpFields,
    pub verification_result: String,
    /// Verdict and fields from the enrichment strategy, logged side by side
    /// with the local result when a strategy is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_fields: Option<KtpFields>,
    pub created_at: i64,
}
