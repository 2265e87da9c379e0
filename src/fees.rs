//! Fee arithmetic. Integer floor division only, computed per batch so a
//! partially-failed run never charges for batches that did not confirm.

use crate::params::MAX_FEE_BPS;
use crate::types::{CandidateAccount, FeePreview};

/// `floor(gross * bps / 10_000)` and the remainder for the owner.
///
/// Zero-fee mode (`fee_recipient_configured == false` or `fee_bps == 0`)
/// returns `(0, gross)`. The fee can never exceed the gross amount for any
/// rate in `0..=10_000`, so the net is never negative.
pub fn compute_fee(gross_lamports: u64, fee_bps: u16, fee_recipient_configured: bool) -> (u64, u64) {
    if !fee_recipient_configured || fee_bps == 0 {
        return (0, gross_lamports);
    }
    let bps = fee_bps.min(MAX_FEE_BPS);
    // u128 intermediate: 10_000 * u64::MAX overflows u64
    let fee = (gross_lamports as u128 * bps as u128 / MAX_FEE_BPS as u128) as u64;
    (fee, gross_lamports.saturating_sub(fee))
}

/// Advisory totals over a selection, from the lamport values known at scan
/// time. Pure and side-effect free; call it as often as the view layer likes.
pub fn preview_fees(
    accounts: &[CandidateAccount],
    fee_bps: u16,
    fee_recipient_configured: bool,
) -> FeePreview {
    let gross_lamports: u64 = accounts.iter().map(|a| a.lamports).sum();
    let (fee_lamports, net_lamports) =
        compute_fee(gross_lamports, fee_bps, fee_recipient_configured);
    FeePreview {
        gross_lamports,
        fee_lamports,
        net_lamports,
    }
}

/// "300 bps" → "3.00%", for the fee line in reports.
pub fn pct_from_bps(bps: u16) -> String {
    format!("{:.2}%", bps as f64 / 100.0)
}
