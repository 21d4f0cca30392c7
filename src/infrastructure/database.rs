use crate::domain::{Document, DocumentStatus, VerificationLogEntry};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Partial update of the mutable Document fields. `updated_at` is bumped on
/// every applied update; `token_id`, once stored, is never overwritten.
#[derive(Debug, Default, Clone)]
pub struct DocumentUpdate {
    pub status: Option<DocumentStatus>,
    pub token_id: Option<u64>,
}

pub trait DocumentStore: Send + Sync {
    /// Persist a new Draft document. The store assigns the id and timestamps.
    fn create_document(
        &self,
        wallet_address: &str,
        file_name: &str,
        file_hash: &str,
    ) -> Result<Document, StoreError>;

    fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError>;

    fn update_document(&self, id: &str, update: DocumentUpdate) -> Result<(), StoreError>;

    /// Compare-and-set variant: applies the update only while the stored
    /// status still equals `expected`. Returns whether a row changed.
    fn transition(
        &self,
        id: &str,
        expected: DocumentStatus,
        update: DocumentUpdate,
    ) -> Result<bool, StoreError>;

    fn list_documents(&self) -> Result<Vec<Document>, StoreError>;

    fn append_log(&self, entry: &VerificationLogEntry) -> Result<(), StoreError>;

    /// Log entries for one document, ascending by `created_at`.
    fn list_logs(&self, document_id: &str) -> Result<Vec<VerificationLogEntry>, StoreError>;

    fn count_documents(&self) -> Result<usize, StoreError>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                wallet_address TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_hash TEXT NOT NULL,
                status TEXT NOT NULL,
                token_id INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_file_hash ON documents(file_hash)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS document_logs (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                ocr_text TEXT NOT NULL,
                parsed_fields TEXT NOT NULL,
                verification_result TEXT NOT NULL,
                ai_verdict TEXT,
                ai_fields TEXT,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_logs_document_created
             ON document_logs(document_id, created_at)",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Recover the connection if a previous holder panicked.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn row_to_document(row: &rusqlite::Row) -> Result<Document, rusqlite::Error> {
        let status_str: String = row.get(4)?;
        let status = DocumentStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown document status: {status_str}").into(),
            )
        })?;
        let token_id: Option<i64> = row.get(5)?;

        Ok(Document {
            id: row.get(0)?,
            wallet_address: row.get(1)?,
            file_name: row.get(2)?,
            file_hash: row.get(3)?,
            status,
            token_id: token_id.map(|t| t as u64),
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn row_to_log(row: &rusqlite::Row) -> Result<(VerificationLogEntry, String, Option<String>), rusqlite::Error> {
        let parsed_fields_json: String = row.get(3)?;
        let ai_fields_json: Option<String> = row.get(6)?;

        let entry = VerificationLogEntry {
            id: row.get(0)?,
            document_id: row.get(1)?,
            ocr_text: row.get(2)?,
            parsed_fields: Default::default(),
            verification_result: row.get(4)?,
            ai_verdict: row.get(5)?,
            ai_fields: None,
            created_at: row.get(7)?,
        };
        Ok((entry, parsed_fields_json, ai_fields_json))
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl DocumentStore for SqliteStore {
    fn create_document(
        &self,
        wallet_address: &str,
        file_name: &str,
        file_hash: &str,
    ) -> Result<Document, StoreError> {
        let now = now_millis();
        let doc = Document {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_address: wallet_address.to_string(),
            file_name: file_name.to_string(),
            file_hash: file_hash.to_string(),
            status: DocumentStatus::Draft,
            token_id: None,
            created_at: now,
            updated_at: now,
        };

        self.conn().execute(
            "INSERT INTO documents
                 (id, wallet_address, file_name, file_hash, status, token_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)",
            params![
                &doc.id,
                &doc.wallet_address,
                &doc.file_name,
                &doc.file_hash,
                doc.status.as_str(),
                doc.created_at,
                doc.updated_at
            ],
        )?;

        Ok(doc)
    }

    fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let doc = self
            .conn()
            .query_row(
                "SELECT id, wallet_address, file_name, file_hash, status, token_id, created_at, updated_at
                 FROM documents
                 WHERE id = ?1",
                params![id],
                Self::row_to_document,
            )
            .optional()?;

        Ok(doc)
    }

    fn update_document(&self, id: &str, update: DocumentUpdate) -> Result<(), StoreError> {
        let affected = self.conn().execute(
            "UPDATE documents
             SET status = COALESCE(?1, status),
                 token_id = COALESCE(token_id, ?2),
                 updated_at = ?3
             WHERE id = ?4",
            params![
                update.status.map(|s| s.as_str()),
                update.token_id.map(|t| t as i64),
                now_millis(),
                id
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn transition(
        &self,
        id: &str,
        expected: DocumentStatus,
        update: DocumentUpdate,
    ) -> Result<bool, StoreError> {
        let affected = self.conn().execute(
            "UPDATE documents
             SET status = COALESCE(?1, status),
                 token_id = COALESCE(token_id, ?2),
                 updated_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                update.status.map(|s| s.as_str()),
                update.token_id.map(|t| t as i64),
                now_millis(),
                id,
                expected.as_str()
            ],
        )?;

        Ok(affected > 0)
    }

    fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, wallet_address, file_name, file_hash, status, token_id, created_at, updated_at
             FROM documents
             ORDER BY created_at",
        )?;
        let docs = stmt
            .query_map([], Self::row_to_document)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    fn append_log(&self, entry: &VerificationLogEntry) -> Result<(), StoreError> {
        let parsed_fields = serde_json::to_string(&entry.parsed_fields)?;
        let ai_fields = entry
            .ai_fields
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn().execute(
            "INSERT INTO document_logs
                 (id, document_id, ocr_text, parsed_fields, verification_result,
                  ai_verdict, ai_fields, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &entry.id,
                &entry.document_id,
                &entry.ocr_text,
                parsed_fields,
                &entry.verification_result,
                &entry.ai_verdict,
                ai_fields,
                entry.created_at
            ],
        )?;

        Ok(())
    }

    fn list_logs(&self, document_id: &str) -> Result<Vec<VerificationLogEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, document_id, ocr_text, parsed_fields, verification_result,
                    ai_verdict, ai_fields, created_at
             FROM document_logs
             WHERE document_id = ?1
             ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![document_id], Self::row_to_log)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut logs = Vec::with_capacity(rows.len());
        for (mut entry, parsed_fields_json, ai_fields_json) in rows {
            entry.parsed_fields = serde_json::from_str(&parsed_fields_json)?;
            entry.ai_fields = ai_fields_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            logs.push(entry);
        }
        Ok(logs)
    }

    fn count_documents(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
