use crate::domain::KtpFields;
use serde::{Deserialize, Serialize};

/// Outcome of scoring a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Verified,
    ManualReview,
    Rejected,
}

impl Verdict {
    /// Wire form, matching what reviewers and the partner backend expect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Verified => "Verified",
            Verdict::ManualReview => "Manual Review",
            Verdict::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraction of the required field set that is filled, in [0.0, 1.0].
pub fn confidence(fields: &KtpFields) -> f64 {
    fields.required_filled() as f64 / fields.required().len() as f64
}

/// Score a parsed KTP into a verdict.
///
/// Pure and deterministic: all four required fields present -> Verified,
/// three of four -> Manual Review, anything less -> Rejected. Empty input
/// text parses to zero filled fields and therefore rejects.
pub fn score(fields: &KtpFields) -> Verdict {
    let confidence = confidence(fields);
    if confidence == 1.0 {
        Verdict::Verified
    } else if confidence >= 0.75 {
        Verdict::ManualReview
    } else {
        Verdict::Rejected
    }
}
