use thiserror::Error;

/// Terminal conditions of a scan or a claim run.
///
/// A batch-level failure aborts the *remaining* batches of the run but never
/// rolls back batches that already confirmed; the session keeps their totals.
/// Nothing is retried automatically — the caller starts over with a fresh
/// `scan` + `run_claim`.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Ledger read failed during scan; the candidate list has been cleared.
    #[error("scan failed: {0}")]
    Discovery(String),

    /// Claim was attempted without the preconditions (empty selection,
    /// no connected signer, malformed configuration). No ledger interaction
    /// has happened.
    #[error("not ready: {0}")]
    Validation(String),

    /// Pre-flight simulation of batch `index` (1-based) failed.
    #[error("batch {index}: simulation failed: {detail}")]
    Simulation { index: usize, detail: String },

    /// The external signer declined batch `index`.
    #[error("batch {index}: signing rejected: {detail}")]
    SigningRejected { index: usize, detail: String },

    /// The ledger rejected batch `index`, or its blockhash expired before
    /// confirmation.
    #[error("batch {index}: execution failed: {detail}")]
    Execution { index: usize, detail: String },
}

impl ClaimError {
    /// 1-based index of the failing batch, where applicable.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            ClaimError::Simulation { index, .. }
            | ClaimError::SigningRejected { index, .. }
            | ClaimError::Execution { index, .. } => Some(*index),
            _ => None,
        }
    }
}
