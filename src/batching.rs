//! Partitioning of a selection into bounded batches, one per transaction.

use crate::fees::compute_fee;
use crate::types::{Batch, CandidateAccount};

/// Split `selection` into contiguous chunks of at most `max_per_tx`, in the
/// original order; the last chunk may be shorter. Fee figures are advisory
/// estimates from scan-time lamports — the builder recomputes them from
/// fresh balances right before each batch is sent.
pub fn partition(
    selection: Vec<CandidateAccount>,
    max_per_tx: usize,
    fee_bps: u16,
    fee_recipient_configured: bool,
) -> Vec<Batch> {
    debug_assert!(max_per_tx > 0, "max_per_tx validated at config time");

    selection
        .chunks(max_per_tx.max(1))
        .map(|chunk| {
            let gross_lamports: u64 = chunk.iter().map(|a| a.lamports).sum();
            let (fee_lamports, net_lamports) =
                compute_fee(gross_lamports, fee_bps, fee_recipient_configured);
            Batch {
                accounts: chunk.to_vec(),
                gross_lamports,
                fee_lamports,
                net_lamports,
            }
        })
        .collect()
}
