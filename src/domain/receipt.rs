use serde::{Deserialize, Serialize};

/// Confirmation record for a submitted ledger transaction. Success or failure
/// is determined by the receipt, not by submission acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub reverted: bool,
}

/// Status of the attestation token as the contract reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnChainStatus {
    Draft,
    Reviewed,
    Signed,
}

impl OnChainStatus {
    /// Contract encoding: 0 = Draft, 1 = Reviewed, 2 = Signed.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(OnChainStatus::Draft),
            1 => Some(OnChainStatus::Reviewed),
            2 => Some(OnChainStatus::Signed),
            _ => None,
        }
    }
}
