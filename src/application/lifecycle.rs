use crate::application::enrich::{Enrichment, NoopEnrichment};
use crate::application::parser::parse_ktp;
use crate::application::verification::{score, Verdict};
use crate::domain::{Document, DocumentStatus, TxReceipt, VerificationLogEntry};
use crate::infrastructure::crypto;
use crate::infrastructure::database::{DocumentStore, DocumentUpdate, StoreError};
use crate::infrastructure::extract::{BasicExtractor, TextExtractor};
use crate::infrastructure::ledger::{LedgerError, LedgerGateway};
use crate::infrastructure::notifier::{KycMirrorUpdate, Notifier};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("content cannot be empty")]
    EmptyContent,

    #[error("filename cannot be empty")]
    EmptyFilename,

    #[error("document not found")]
    NotFound,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Per-document async locks guarding the read-check-update window of the
/// admin transitions. Review and sign are not idempotent on the ledger, so
/// two concurrent calls for the same document must not both pass the status
/// check.
#[derive(Default)]
struct DocumentLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    async fn for_document(&self, id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        map.entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Orchestrates upload -> extract -> parse -> verify -> mint -> review ->
/// sign, keeping the record store and the ledger consistent.
///
/// Consistency contract: a ledger failure aborts the transition with no
/// off-chain change, so the stored status never outruns confirmed on-chain
/// state. Notification delivery is decoupled and can never roll a
/// transition back.
pub struct LifecycleManager {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<dyn LedgerGateway>,
    extractor: Arc<dyn TextExtractor>,
    enrichment: Arc<dyn Enrichment>,
    notifier: Arc<Notifier>,
    temp_dir: PathBuf,
    locks: DocumentLocks,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ledger: Arc<dyn LedgerGateway>,
        notifier: Arc<Notifier>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            ledger,
            extractor: Arc::new(BasicExtractor),
            enrichment: Arc::new(NoopEnrichment),
            notifier,
            temp_dir,
            locks: DocumentLocks::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.enrichment = enrichment;
        self
    }

    /// Upload intake: persist a Draft, run extraction and verification,
    /// record the audit log entry, apply the verdict, and eagerly mint the
    /// attestation token unless the document was rejected outright.
    pub async fn ingest(
        &self,
        wallet_address: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<Document, LifecycleError> {
        if content.is_empty() {
            return Err(LifecycleError::EmptyContent);
        }
        if file_name.trim().is_empty() {
            return Err(LifecycleError::EmptyFilename);
        }

        let file_hash = Document::hash_bytes(content);
        let doc = self
            .store
            .create_document(wallet_address, file_name, &file_hash)?;
        info!(document_id = doc.id.as_str(), file_hash = file_hash.as_str(), "document ingested");

        let text = self.spill_extract_secure(content, file_name, &file_hash);
        let fields = parse_ktp(&text);
        let analysis = self.enrichment.analyze(&text).await;
        let verdict = score(&fields);

        let entry = VerificationLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            ocr_text: text,
            parsed_fields: fields,
            verification_result: verdict.as_str().to_string(),
            ai_verdict: analysis.as_ref().map(|a| a.verdict.as_str().to_string()),
            ai_fields: analysis.map(|a| a.fields),
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        self.store.append_log(&entry)?;

        match verdict {
            Verdict::Verified => {
                self.store.transition(
                    &doc.id,
                    DocumentStatus::Draft,
                    DocumentUpdate {
                        status: Some(DocumentStatus::Verified),
                        token_id: None,
                    },
                )?;
            }
            Verdict::Rejected => {
                self.store.transition(
                    &doc.id,
                    DocumentStatus::Draft,
                    DocumentUpdate {
                        status: Some(DocumentStatus::Rejected),
                        token_id: None,
                    },
                )?;
            }
            // Left in Draft for an admin to look at.
            Verdict::ManualReview => {}
        }

        if verdict != Verdict::Rejected {
            match self
                .ledger
                .mint(wallet_address, &file_hash, &token_uri(&doc))
                .await
            {
                Ok(token_id) => {
                    self.store.update_document(
                        &doc.id,
                        DocumentUpdate {
                            status: None,
                            token_id: Some(token_id),
                        },
                    )?;
                    info!(document_id = doc.id.as_str(), token_id, "attestation minted at intake");
                }
                // Not fatal: review lazily mints when the token is first needed.
                Err(e) => {
                    warn!(document_id = doc.id.as_str(), error = %e, "intake mint failed, deferring to review")
                }
            }
        }

        let updated = self
            .store
            .get_document(&doc.id)?
            .ok_or(LifecycleError::NotFound)?;
        self.notify_upload(&updated, verdict);
        Ok(updated)
    }

    /// Admin review: lazily mint if needed, submit the on-chain review, then
    /// persist `Reviewed`. Ledger failure leaves the document untouched.
    pub async fn review(
        &self,
        document_id: &str,
        reviewed_by: Option<String>,
    ) -> Result<Document, LifecycleError> {
        let lock = self.locks.for_document(document_id).await;
        let _guard = lock.lock().await;

        let doc = self
            .store
            .get_document(document_id)?
            .ok_or(LifecycleError::NotFound)?;
        if !doc.status.reviewable() {
            return Err(LifecycleError::InvalidState(format!(
                "cannot review a {} document",
                doc.status
            )));
        }

        let token_id = match doc.token_id {
            Some(token_id) => token_id,
            // Lazy mint. The hash lookup first recovers a token whose mint
            // succeeded earlier without being recorded off-chain.
            None => match self.ledger.token_id_of_hash(&doc.file_hash).await? {
                Some(token_id) => {
                    debug!(document_id, token_id, "recovered existing token by hash");
                    token_id
                }
                None => {
                    self.ledger
                        .mint(&doc.wallet_address, &doc.file_hash, &token_uri(&doc))
                        .await?
                }
            },
        };

        let receipt = self.ledger.review(token_id).await?;

        let applied = self.store.transition(
            document_id,
            doc.status,
            DocumentUpdate {
                status: Some(DocumentStatus::Reviewed),
                token_id: Some(token_id),
            },
        )?;
        if !applied {
            return Err(LifecycleError::InvalidState(
                "document changed while review was in flight".to_string(),
            ));
        }
        info!(document_id, token_id, tx_hash = receipt.tx_hash.as_str(), "document reviewed");

        let updated = self
            .store
            .get_document(document_id)?
            .ok_or(LifecycleError::NotFound)?;
        self.notify_transition(&updated, token_id, &receipt, reviewed_by, "review");
        Ok(updated)
    }

    /// Admin sign: requires a prior review (status and token present),
    /// submits the on-chain sign, then persists `Signed`.
    pub async fn sign(
        &self,
        document_id: &str,
        signed_by: Option<String>,
    ) -> Result<Document, LifecycleError> {
        let lock = self.locks.for_document(document_id).await;
        let _guard = lock.lock().await;

        let doc = self
            .store
            .get_document(document_id)?
            .ok_or(LifecycleError::NotFound)?;
        let token_id = doc.token_id.ok_or_else(|| {
            LifecycleError::InvalidState(
                "document has no attestation token; it was never reviewed or minted".to_string(),
            )
        })?;
        if doc.status != DocumentStatus::Reviewed {
            return Err(LifecycleError::InvalidState(format!(
                "cannot sign a {} document",
                doc.status
            )));
        }

        let receipt = self.ledger.sign(token_id).await?;

        let applied = self.store.transition(
            document_id,
            DocumentStatus::Reviewed,
            DocumentUpdate {
                status: Some(DocumentStatus::Signed),
                token_id: None,
            },
        )?;
        if !applied {
            return Err(LifecycleError::InvalidState(
                "document changed while sign was in flight".to_string(),
            ));
        }
        info!(document_id, token_id, tx_hash = receipt.tx_hash.as_str(), "document signed");

        let updated = self
            .store
            .get_document(document_id)?
            .ok_or(LifecycleError::NotFound)?;
        self.notify_transition(&updated, token_id, &receipt, signed_by, "sign");
        Ok(updated)
    }

    pub fn document(&self, document_id: &str) -> Result<Document, LifecycleError> {
        self.store
            .get_document(document_id)?
            .ok_or(LifecycleError::NotFound)
    }

    pub fn documents(&self) -> Result<Vec<Document>, LifecycleError> {
        Ok(self.store.list_documents()?)
    }

    pub fn logs(&self, document_id: &str) -> Result<Vec<VerificationLogEntry>, LifecycleError> {
        if self.store.get_document(document_id)?.is_none() {
            return Err(LifecycleError::NotFound);
        }
        Ok(self.store.list_logs(document_id)?)
    }

    pub fn document_count(&self) -> Result<usize, LifecycleError> {
        Ok(self.store.count_documents()?)
    }

    /// Spill the upload to a temp file, extract text, and encrypt the file
    /// at rest. The plaintext temp file is removed whatever happens;
    /// extraction works from the in-memory bytes so a disk failure only
    /// degrades, never aborts.
    fn spill_extract_secure(&self, content: &[u8], file_name: &str, file_hash: &str) -> String {
        let text = self.extractor.extract(content, file_name);

        let safe_name = file_name.replace(['/', '\\'], "_");
        let temp_path = self.temp_dir.join(format!("{file_hash}_{safe_name}"));
        let spilled = std::fs::create_dir_all(&self.temp_dir)
            .and_then(|_| std::fs::write(&temp_path, content));

        match spilled {
            Ok(()) => {
                match crypto::encrypt_at_rest(&temp_path) {
                    Ok((encrypted_path, _key)) => {
                        debug!(path = %encrypted_path.display(), "upload encrypted at rest")
                    }
                    Err(e) => warn!(error = %e, "failed to encrypt upload at rest"),
                }
                if let Err(e) = std::fs::remove_file(&temp_path) {
                    warn!(error = %e, "failed to remove plaintext temp file");
                }
            }
            Err(e) => warn!(error = %e, "failed to spill upload to temp storage"),
        }

        text
    }

    fn notify_upload(&self, doc: &Document, verdict: Verdict) {
        let notifier = Arc::clone(&self.notifier);
        let wallet = doc.wallet_address.clone();
        let document_id = doc.id.clone();
        let status = doc.status.as_str().to_string();
        let verdict = verdict.as_str().to_string();

        tokio::spawn(async move {
            let extra = serde_json::json!({
                "documentId": &document_id,
                "status": &status,
                "verdict": &verdict,
            });
            notifier
                .send_notification(
                    &wallet,
                    "system",
                    "kyc_upload",
                    "KYC document received",
                    &format!("Automatic verification result: {verdict}"),
                    extra,
                )
                .await;
        });
    }

    fn notify_transition(
        &self,
        doc: &Document,
        token_id: u64,
        receipt: &TxReceipt,
        actor: Option<String>,
        action: &'static str,
    ) {
        let notifier = Arc::clone(&self.notifier);
        let wallet = doc.wallet_address.clone();
        let document_id = doc.id.clone();
        let status = doc.status.as_str().to_string();
        let tx_hash = receipt.tx_hash.clone();
        let signature = attestation_digest(action, token_id);
        let executor = actor.clone().unwrap_or_else(|| "system".to_string());

        tokio::spawn(async move {
            let extra = serde_json::json!({
                "documentId": &document_id,
                "tokenId": token_id,
                "status": &status,
                "txHash": &tx_hash,
            });
            notifier
                .send_notification(
                    &wallet,
                    &executor,
                    "kyc_status",
                    "KYC status updated",
                    &format!("Document is now {status}"),
                    extra,
                )
                .await;

            let update = KycMirrorUpdate {
                status: Some(status),
                signature: Some(signature),
                reviewed_by: actor,
                tx_hash: Some(tx_hash),
                remarks: None,
            };
            notifier.update_external_kyc(token_id, &update).await;
        });
    }
}

fn token_uri(doc: &Document) -> String {
    format!("kyc://documents/{}", doc.id)
}

/// Digest the partner backend can recompute to tie a status update to the
/// token it attests.
fn attestation_digest(action: &str, token_id: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action.as_bytes());
    hasher.update(b":");
    hasher.update(token_id.to_be_bytes());
    hex::encode(hasher.finalize())
}
