pub mod application;
pub mod config;
pub mod domain;
pub mod handlers;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{LifecycleError, LifecycleManager, Verdict};
pub use domain::{Document, DocumentStatus, KtpFields, VerificationLogEntry};
pub use infrastructure::database::{DocumentStore, SqliteStore};
pub use infrastructure::ledger::{HttpLedgerGateway, LedgerError, LedgerGateway};
