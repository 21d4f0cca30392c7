mod document;
mod ktp;
mod log;
mod receipt;

pub use document::{Document, DocumentStatus};
pub use ktp::KtpFields;
pub use log::VerificationLogEntry;
pub use receipt::{OnChainStatus, TxReceipt};
