//! End-to-end accounting of a multi-batch claim, without a ledger: batches
//! come from the real partitioner and the session is driven the way the
//! orchestrator drives it on confirmation / failure.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solint_reclaim::batching::partition;
use solint_reclaim::error::ClaimError;
use solint_reclaim::fees::preview_fees;
use solint_reclaim::types::{CandidateAccount, ClaimSession, SessionState, TokenProgramKind};

fn ten_accounts() -> Vec<CandidateAccount> {
    (0..10)
        .map(|i| CandidateAccount {
            address: Pubkey::new_unique(),
            program: if i % 2 == 0 {
                TokenProgramKind::Legacy
            } else {
                TokenProgramKind::Token2022
            },
            mint: Pubkey::new_unique(),
            lamports: 1_000_000,
        })
        .collect()
}

#[test]
fn full_success_without_fee() {
    // 10 × 1_000_000 lamports, maxPerTx = 8, no fee recipient
    let batches = partition(ten_accounts(), 8, 300, false);
    assert_eq!(batches.len(), 2);

    let mut session = ClaimSession::new(batches.len());
    for b in &batches {
        assert_eq!(b.fee_lamports, 0);
        session.record_confirmed(b.net_lamports, b.fee_lamports, Some(Signature::default()));
    }
    session.finish();

    assert_eq!(session.state, SessionState::Completed);
    assert_eq!(session.completed_count, 2);
    assert_eq!(session.total_reclaimed_lamports, 10_000_000);
    assert_eq!(session.total_fee_lamports, 0);
    assert!(session.last_signature.is_some());
}

#[test]
fn full_success_with_300bps_fee() {
    let batches = partition(ten_accounts(), 8, 300, true);
    assert_eq!(batches[0].net_lamports, 7_760_000);
    assert_eq!(batches[1].net_lamports, 1_940_000);

    let mut session = ClaimSession::new(batches.len());
    for b in &batches {
        session.record_confirmed(b.net_lamports, b.fee_lamports, Some(Signature::default()));
    }
    session.finish();

    assert_eq!(session.total_reclaimed_lamports, 9_700_000);
    assert_eq!(session.total_fee_lamports, 300_000);
}

#[test]
fn mid_run_failure_keeps_the_first_batch_and_charges_no_further_fee() {
    let accounts = ten_accounts();
    let batches = partition(accounts.clone(), 8, 300, true);
    let mut candidates = accounts;

    let mut session = ClaimSession::new(batches.len());

    // batch 1 confirms: candidate set shrinks by its accounts
    let first = &batches[0];
    session.record_confirmed(first.net_lamports, first.fee_lamports, Some(Signature::default()));
    let closed: Vec<Pubkey> = first.accounts.iter().map(|a| a.address).collect();
    candidates.retain(|c| !closed.contains(&c.address));

    // batch 2 fails execution: nothing more is recorded or removed
    session.record_failure(ClaimError::Execution {
        index: 2,
        detail: "custom program error".into(),
    });
    session.finish();

    assert_eq!(session.state, SessionState::Aborted);
    assert_eq!(session.completed_count, 1);
    assert_eq!(session.total_reclaimed_lamports, 7_760_000);
    assert_eq!(session.total_fee_lamports, 240_000);

    // batch 2's accounts are untouched in the candidate set
    assert_eq!(candidates.len(), 2);
    for survivor in &batches[1].accounts {
        assert!(candidates.iter().any(|c| c.address == survivor.address));
    }
    assert_eq!(session.failure.as_ref().and_then(|e| e.batch_index()), Some(2));
}

#[test]
fn preview_matches_the_sum_of_per_batch_figures() {
    // fee-per-batch equals fee-over-selection when every batch divides
    // evenly at the bps boundary (1_000_000-lamport accounts at 300 bps)
    let accounts = ten_accounts();
    let whole = preview_fees(&accounts, 300, true);
    let batches = partition(accounts, 8, 300, true);

    let fee_sum: u64 = batches.iter().map(|b| b.fee_lamports).sum();
    let net_sum: u64 = batches.iter().map(|b| b.net_lamports).sum();
    assert_eq!(whole.fee_lamports, fee_sum);
    assert_eq!(whole.net_lamports, net_sum);
}
