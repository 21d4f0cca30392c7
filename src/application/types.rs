use crate::domain::{Document, VerificationLogEntry};
use serde::{Deserialize, Serialize};

/// Request to upload a document for KYC intake.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadRequest {
    /// Owning ledger account.
    pub wallet_address: String,
    /// Original filename.
    pub file_name: String,
    /// Base64-encoded document content.
    pub content: String,
}

/// Admin request body for the review transition.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

/// Admin request body for the sign transition.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignRequest {
    #[serde(default)]
    pub signed_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub wallet_address: String,
    pub file_name: String,
    pub file_hash: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Document> for DocumentResponse {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            wallet_address: doc.wallet_address.clone(),
            file_name: doc.file_name.clone(),
            file_hash: doc.file_hash.clone(),
            status: doc.status.as_str().to_string(),
            token_id: doc.token_id,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub document_id: String,
    pub logs: Vec<VerificationLogEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
