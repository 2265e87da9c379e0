//! The claim loop. Batches go through simulate → sign → submit → confirm
//! strictly one at a time: the same fee payer signs every transaction, and
//! the abort-on-first-failure / keep-prior-successes contract only holds
//! under strict ordering. Local state (candidate set + caller's selection)
//! is reconciled only after a batch confirms on-ledger.

use log::{debug, info, warn};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;

use crate::batching::partition;
use crate::builder::{build_batch_transaction, BuiltBatch};
use crate::classifier::scan_empty_accounts;
use crate::config::EngineConfig;
use crate::error::ClaimError;
use crate::fees::preview_fees;
use crate::params::CONFIRM_POLL_INTERVAL;
use crate::signer::ClaimSigner;
use crate::types::{
    BatchStatus, CandidateAccount, ClaimProgress, ClaimSession, FeePreview,
};

fn emit(
    progress: &Option<UnboundedSender<ClaimProgress>>,
    index: usize,
    total: usize,
    status: BatchStatus,
    detail: Option<String>,
) {
    if let Some(tx) = progress {
        // a closed receiver never blocks the claim loop
        let _ = tx.send(ClaimProgress {
            index,
            total,
            status,
            detail,
        });
    }
}

/// The blockhash stays valid at its last height; only the height after it
/// invalidates the transaction.
fn blockhash_expired(height: u64, last_valid_block_height: u64) -> bool {
    height > last_valid_block_height
}

/// Ledger-facing half of the claim loop. The loop drives build, simulation
/// and submission through this seam the same way signing already goes
/// through [`ClaimSigner`]; [`RpcLedger`] is the live implementation.
trait LedgerOps {
    async fn build(
        &self,
        wallet: &Pubkey,
        accounts: &[CandidateAccount],
    ) -> anyhow::Result<Option<BuiltBatch>>;

    async fn simulate(&self, built: &BuiltBatch) -> Result<(), String>;

    async fn submit_and_confirm(
        &self,
        tx: &Transaction,
        last_valid_block_height: u64,
    ) -> Result<Signature, String>;
}

struct RpcLedger {
    rpc: Arc<RpcClient>,
    config: EngineConfig,
}

impl LedgerOps for RpcLedger {
    async fn build(
        &self,
        wallet: &Pubkey,
        accounts: &[CandidateAccount],
    ) -> anyhow::Result<Option<BuiltBatch>> {
        build_batch_transaction(&self.rpc, wallet, accounts, &self.config).await
    }

    async fn simulate(&self, built: &BuiltBatch) -> Result<(), String> {
        let sim = self
            .rpc
            .simulate_transaction(&built.tx)
            .await
            .map_err(|e| format!("simulate_transaction failed: {e}"))?;
        if let Some(err) = sim.value.err {
            let logs = sim.value.logs.unwrap_or_default();
            return Err(format!("{err} | logs: {}", logs.join(" | ")));
        }
        debug!("simulation ok ({} closes)", built.close_count);
        Ok(())
    }

    /// Send and poll until confirmed, failed, or past the blockhash's
    /// validity height — the ledger's own expiry window is the only timeout.
    async fn submit_and_confirm(
        &self,
        tx: &Transaction,
        last_valid_block_height: u64,
    ) -> Result<Signature, String> {
        let sig = self
            .rpc
            .send_transaction_with_config(
                tx,
                RpcSendTransactionConfig {
                    skip_preflight: false,
                    preflight_commitment: Some(CommitmentConfig::processed().commitment),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| format!("send_transaction failed: {e}"))?;
        debug!("submitted {sig}, valid until height {last_valid_block_height}");

        loop {
            if let Some(status) = self
                .rpc
                .get_signature_status(&sig)
                .await
                .map_err(|e| format!("get_signature_status failed: {e}"))?
            {
                return match status {
                    Ok(()) => Ok(sig),
                    Err(e) => Err(format!("transaction {sig} failed on-ledger: {e:?}")),
                };
            }

            let height = self
                .rpc
                .get_block_height()
                .await
                .map_err(|e| format!("get_block_height failed: {e}"))?;
            if blockhash_expired(height, last_valid_block_height) {
                return Err(format!(
                    "transaction {sig} expired: blockhash invalid past height {last_valid_block_height}"
                ));
            }

            sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}

/// Drives scan → preview → claim over one wallet. Owns the live candidate
/// set; nothing else mutates it.
pub struct ClaimEngine {
    rpc: Arc<RpcClient>,
    config: EngineConfig,
    signer: Option<Arc<dyn ClaimSigner>>,
    candidates: Vec<CandidateAccount>,
}

impl ClaimEngine {
    pub fn new(rpc: Arc<RpcClient>, config: EngineConfig) -> Self {
        Self {
            rpc,
            config,
            signer: None,
            candidates: Vec::new(),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn ClaimSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn candidates(&self) -> &[CandidateAccount] {
        &self.candidates
    }

    /// Discover the wallet's empty token accounts across both token programs.
    /// On failure the previous candidate list is cleared, never left stale.
    pub async fn scan(&mut self, wallet: &Pubkey) -> Result<&[CandidateAccount], ClaimError> {
        match scan_empty_accounts(&self.rpc, wallet).await {
            Ok(found) => {
                info!("scan: {} empty token accounts", found.len());
                self.candidates = found;
                Ok(&self.candidates)
            }
            Err(e) => {
                self.candidates.clear();
                Err(e)
            }
        }
    }

    /// Advisory gross/fee/net over the selected candidates. Pure.
    pub fn preview_fees(&self, selection: &[Pubkey]) -> FeePreview {
        let picked = self.resolve_selection(selection);
        preview_fees(&picked, self.config.fee_bps, self.config.fee_configured())
    }

    /// Run the full claim over `selection`. Returns `Err` only when nothing
    /// was attempted (empty selection, no signer, nothing resolvable); once
    /// batches start, failures are recorded inside the returned session and
    /// already-confirmed batches keep their effects.
    pub async fn run_claim(
        &mut self,
        selection: &mut Vec<Pubkey>,
        progress: Option<UnboundedSender<ClaimProgress>>,
    ) -> Result<ClaimSession, ClaimError> {
        let ledger = RpcLedger {
            rpc: self.rpc.clone(),
            config: self.config.clone(),
        };
        self.run_claim_on(&ledger, selection, progress).await
    }

    async fn run_claim_on<L: LedgerOps>(
        &mut self,
        ledger: &L,
        selection: &mut Vec<Pubkey>,
        progress: Option<UnboundedSender<ClaimProgress>>,
    ) -> Result<ClaimSession, ClaimError> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| ClaimError::Validation("no signer connected".into()))?;
        if selection.is_empty() {
            return Err(ClaimError::Validation("selection is empty".into()));
        }
        let picked = self.resolve_selection(selection);
        if picked.is_empty() {
            return Err(ClaimError::Validation(
                "selection matches no known candidate".into(),
            ));
        }

        let batches = partition(
            picked,
            self.config.max_accounts_per_tx,
            self.config.fee_bps,
            self.config.fee_configured(),
        );
        let total = batches.len();
        let mut session = ClaimSession::new(total);
        let wallet = signer.pubkey();

        for (i, batch) in batches.iter().enumerate() {
            let index = i + 1;
            info!("claim batch {index}/{total}: {} accounts", batch.accounts.len());
            emit(&progress, index, total, BatchStatus::Simulating, None);

            // a. build from fresh balances
            let built = match ledger.build(&wallet, &batch.accounts).await {
                Ok(b) => b,
                Err(e) => {
                    let err = ClaimError::Execution {
                        index,
                        detail: format!("build failed: {e}"),
                    };
                    self.abort(&mut session, &progress, index, total, err);
                    break;
                }
            };

            let Some(built) = built else {
                // every account vanished since the scan — nothing to submit,
                // but the batch is settled and the set still shrinks
                warn!("batch {index}/{total}: all accounts already closed, skipping");
                self.reconcile(&batch.accounts, selection);
                session.record_confirmed(0, 0, None);
                emit(
                    &progress,
                    index,
                    total,
                    BatchStatus::Confirmed,
                    Some("already closed".into()),
                );
                continue;
            };

            // b. simulate
            if let Err(detail) = ledger.simulate(&built).await {
                let err = ClaimError::Simulation { index, detail };
                self.abort(&mut session, &progress, index, total, err);
                break;
            }

            // c. external signature
            emit(&progress, index, total, BatchStatus::AwaitingSignature, None);
            let signed = match signer.sign(built.tx.clone()) {
                Ok(tx) => tx,
                Err(e) => {
                    let err = ClaimError::SigningRejected {
                        index,
                        detail: e.to_string(),
                    };
                    self.abort(&mut session, &progress, index, total, err);
                    break;
                }
            };

            // d. submit + await confirmation inside the blockhash window
            emit(&progress, index, total, BatchStatus::Submitted, None);
            let confirmed = match ledger
                .submit_and_confirm(&signed, built.last_valid_block_height)
                .await
            {
                Ok(sig) => sig,
                Err(detail) => {
                    let err = ClaimError::Execution { index, detail };
                    self.abort(&mut session, &progress, index, total, err);
                    break;
                }
            };

            // f. reconcile only now, with the close confirmed on-ledger
            session.record_confirmed(built.net_lamports, built.fee_lamports, Some(confirmed));
            self.reconcile(&batch.accounts, selection);
            info!(
                "batch {index}/{total} confirmed: {} closes, net {} lamports ({confirmed})",
                built.close_count, built.net_lamports
            );
            emit(
                &progress,
                index,
                total,
                BatchStatus::Confirmed,
                Some(confirmed.to_string()),
            );
        }

        session.finish();
        Ok(session)
    }

    /// Selection order wins; addresses with no live candidate are ignored,
    /// and a repeated address resolves once (two closes of the same account
    /// in one transaction would fail it whole).
    fn resolve_selection(&self, selection: &[Pubkey]) -> Vec<CandidateAccount> {
        let mut seen: HashSet<Pubkey> = HashSet::with_capacity(selection.len());
        selection
            .iter()
            .filter(|addr| seen.insert(**addr))
            .filter_map(|addr| self.candidates.iter().find(|c| c.address == *addr))
            .cloned()
            .collect()
    }

    fn reconcile(&mut self, closed: &[CandidateAccount], selection: &mut Vec<Pubkey>) {
        let gone: HashSet<Pubkey> = closed.iter().map(|a| a.address).collect();
        self.candidates.retain(|c| !gone.contains(&c.address));
        selection.retain(|a| !gone.contains(a));
    }

    fn abort(
        &self,
        session: &mut ClaimSession,
        progress: &Option<UnboundedSender<ClaimProgress>>,
        index: usize,
        total: usize,
        err: ClaimError,
    ) {
        warn!("{err}; aborting remaining batches, {} confirmed so far", session.completed_count);
        emit(progress, index, total, BatchStatus::Failed, Some(err.to_string()));
        session.record_failure(err);
    }
}
