use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Off-chain lifecycle status of a KYC document.
///
/// The off-chain status is authoritative for "has this transition already
/// happened": the on-chain review/sign calls are not idempotent, so the
/// lifecycle manager checks this field before issuing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Draft,
    Verified,
    Rejected,
    Reviewed,
    Signed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "Draft",
            DocumentStatus::Verified => "Verified",
            DocumentStatus::Rejected => "Rejected",
            DocumentStatus::Reviewed => "Reviewed",
            DocumentStatus::Signed => "Signed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Draft" => Some(DocumentStatus::Draft),
            "Verified" => Some(DocumentStatus::Verified),
            "Rejected" => Some(DocumentStatus::Rejected),
            "Reviewed" => Some(DocumentStatus::Reviewed),
            "Signed" => Some(DocumentStatus::Signed),
            _ => None,
        }
    }

    /// Rejected and Signed accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Rejected | DocumentStatus::Signed)
    }

    /// Whether an admin review may start from this status.
    pub fn reviewable(&self) -> bool {
        matches!(self, DocumentStatus::Draft | DocumentStatus::Verified)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub wallet_address: String,
    pub file_name: String,
    pub file_hash: String,
    pub status: DocumentStatus,
    /// Ledger-assigned token, absent until a mint succeeds. Immutable once set.
    pub token_id: Option<u64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document {
    /// SHA-256 of the raw upload bytes, hex-encoded. The hash is the
    /// content-addressed identity binding the document to its on-chain token.
    pub fn hash_bytes(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("{:x}", hasher.finalize())
    }
}
