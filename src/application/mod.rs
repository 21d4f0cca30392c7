mod enrich;
mod lifecycle;
mod parser;
mod types;
mod verification;

pub use enrich::{AiAnalysis, Enrichment, NoopEnrichment};
pub use lifecycle::{LifecycleError, LifecycleManager};
pub use parser::parse_ktp;
pub use types::{
    DocumentResponse, ErrorResponse, LogListResponse, ReviewRequest, SignRequest, UploadRequest,
};
pub use verification::{confidence, score, Verdict};
