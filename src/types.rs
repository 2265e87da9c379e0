use solana_sdk::native_token::lamports_to_sol;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;

use crate::error::ClaimError;

/// Token program that must process the close instruction for an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenProgramKind {
    Legacy,
    Token2022,
}

impl TokenProgramKind {
    pub fn program_id(&self) -> Pubkey {
        match self {
            TokenProgramKind::Legacy => spl_token::id(),
            TokenProgramKind::Token2022 => spl_token_2022::id(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TokenProgramKind::Legacy => "SPL",
            TokenProgramKind::Token2022 => "Token2022",
        }
    }
}

/// One empty token account worth closing: zero token balance, nonzero rent.
/// Created by a scan, removed from the live set only once its close confirms.
#[derive(Clone, Debug)]
pub struct CandidateAccount {
    pub address: Pubkey,
    pub program: TokenProgramKind,
    pub mint: Pubkey,
    /// Rent lamports held by the account itself — this, not the token
    /// balance, is what comes back on close.
    pub lamports: u64,
}

/// Advisory gross / fee / net figures for a selection or a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeePreview {
    pub gross_lamports: u64,
    pub fee_lamports: u64,
    pub net_lamports: u64,
}

impl fmt::Display for FeePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gross {:.6} SOL · fee {:.6} SOL · net {:.6} SOL",
            lamports_to_sol(self.gross_lamports),
            lamports_to_sol(self.fee_lamports),
            lamports_to_sol(self.net_lamports),
        )
    }
}

/// Bounded group of candidates processed in one atomic transaction.
/// The lamport figures here are partition-time estimates; the builder
/// recomputes them from fresh balances right before submission.
#[derive(Clone, Debug)]
pub struct Batch {
    pub accounts: Vec<CandidateAccount>,
    pub gross_lamports: u64,
    pub fee_lamports: u64,
    pub net_lamports: u64,
}

/// Per-batch position in the submit protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Idle,
    Simulating,
    AwaitingSignature,
    Submitted,
    Confirmed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BatchStatus::Idle => "idle",
            BatchStatus::Simulating => "simulating",
            BatchStatus::AwaitingSignature => "awaiting signature",
            BatchStatus::Submitted => "submitted",
            BatchStatus::Confirmed => "confirmed",
            BatchStatus::Failed => "failed",
        }
    }
}

/// Progress event emitted once per state change of the batch in flight.
#[derive(Clone, Debug)]
pub struct ClaimProgress {
    /// 1-based batch index.
    pub index: usize,
    pub total: usize,
    pub status: BatchStatus,
    pub detail: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Completed,
    Aborted,
}

/// Outcome of one multi-batch claim run. Survives partial failure: after any
/// run the caller sees exactly how many batches confirmed and what they paid
/// out, never an all-or-nothing illusion.
#[derive(Debug)]
pub struct ClaimSession {
    pub total_batches: usize,
    pub completed_count: usize,
    pub total_reclaimed_lamports: u64,
    pub total_fee_lamports: u64,
    pub last_signature: Option<Signature>,
    pub state: SessionState,
    pub failure: Option<ClaimError>,
}

impl ClaimSession {
    pub fn new(total_batches: usize) -> Self {
        Self {
            total_batches,
            completed_count: 0,
            total_reclaimed_lamports: 0,
            total_fee_lamports: 0,
            last_signature: None,
            state: SessionState::Running,
            failure: None,
        }
    }

    /// Account for one confirmed batch. `completed_count` only ever grows,
    /// and only through this path.
    pub fn record_confirmed(
        &mut self,
        net_lamports: u64,
        fee_lamports: u64,
        signature: Option<Signature>,
    ) {
        self.completed_count += 1;
        self.total_reclaimed_lamports += net_lamports;
        self.total_fee_lamports += fee_lamports;
        if signature.is_some() {
            self.last_signature = signature;
        }
    }

    /// Abort the run, keeping everything confirmed so far.
    pub fn record_failure(&mut self, err: ClaimError) {
        self.state = SessionState::Aborted;
        self.failure = Some(err);
    }

    /// Called after the last batch confirmed.
    pub fn finish(&mut self) {
        if self.state == SessionState::Running {
            self.state = SessionState::Completed;
        }
    }
}

impl fmt::Display for ClaimSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🏦 Claim session:\n\
             ► batches: {}/{}\n\
             ► reclaimed: {:.6} SOL\n\
             ► fee paid: {:.6} SOL\n\
             ► last tx: {}",
            self.completed_count,
            self.total_batches,
            lamports_to_sol(self.total_reclaimed_lamports),
            lamports_to_sol(self.total_fee_lamports),
            self.last_signature
                .map(|s| s.to_string())
                .unwrap_or_else(|| "—".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_counts_only_grow_through_confirmations() {
        let mut s = ClaimSession::new(3);
        assert_eq!(s.state, SessionState::Running);

        s.record_confirmed(7_760_000, 240_000, Some(Signature::default()));
        assert_eq!(s.completed_count, 1);
        assert_eq!(s.total_reclaimed_lamports, 7_760_000);
        assert_eq!(s.total_fee_lamports, 240_000);

        s.record_failure(ClaimError::Execution {
            index: 2,
            detail: "blockhash expired".into(),
        });
        assert_eq!(s.state, SessionState::Aborted);
        // prior confirmed effects survive the abort
        assert_eq!(s.completed_count, 1);
        assert_eq!(s.total_reclaimed_lamports, 7_760_000);
        assert_eq!(s.failure.as_ref().and_then(|e| e.batch_index()), Some(2));
    }

    #[test]
    fn finish_does_not_resurrect_an_aborted_session() {
        let mut s = ClaimSession::new(1);
        s.record_failure(ClaimError::Validation("no signer".into()));
        s.finish();
        assert_eq!(s.state, SessionState::Aborted);
    }

    #[test]
    fn no_op_batch_keeps_last_signature() {
        let mut s = ClaimSession::new(2);
        let sig = Signature::default();
        s.record_confirmed(1_000, 0, Some(sig));
        s.record_confirmed(0, 0, None);
        assert_eq!(s.completed_count, 2);
        assert_eq!(s.last_signature, Some(sig));
    }
}
