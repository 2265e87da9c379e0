//! Account discovery. Raw jsonParsed token records cross the typed boundary
//! here: each record is parsed and validated individually, broken ones are
//! dropped without failing the scan, and only a failed *fetch* kills the run
//! (no partial candidate list is ever surfaced).

use log::{debug, warn};
use solana_account_decoder::UiAccountData;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_client::rpc_response::RpcKeyedAccount;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::ClaimError;
use crate::types::{CandidateAccount, TokenProgramKind};

/// One record → one candidate, or nothing.
///
/// A candidate must be owned by the scanning wallet, hold a raw token amount
/// of exactly zero (the integer `amount` field, never the float display
/// value), not be a wrapped-SOL account, and carry at least one lamport of
/// rent. Records missing any expected field are malformed and skipped.
pub fn candidate_from_record(
    wallet: &Pubkey,
    program: TokenProgramKind,
    record: &RpcKeyedAccount,
) -> Option<CandidateAccount> {
    let address = Pubkey::from_str(&record.pubkey).ok()?;

    let UiAccountData::Json(parsed) = &record.account.data else {
        warn!("{address}: account data is not jsonParsed, skipping");
        return None;
    };
    let info = parsed.parsed.get("info")?;

    let mint_str = info.get("mint")?.as_str()?;
    let owner_str = info.get("owner")?.as_str()?;
    let amount_str = info.get("tokenAmount")?.get("amount")?.as_str()?;

    // stale or cross-owner data must never produce a candidate
    if Pubkey::from_str(owner_str).ok()? != *wallet {
        return None;
    }

    let amount: u64 = amount_str.parse().ok()?;
    if amount != 0 {
        return None;
    }

    let mint = Pubkey::from_str(mint_str).ok()?;
    if mint == spl_token::native_mint::id() {
        return None;
    }

    // zero-lamport accounts return nothing on close
    let lamports = record.account.lamports;
    if lamports == 0 {
        return None;
    }

    Some(CandidateAccount {
        address,
        program,
        mint,
        lamports,
    })
}

async fn fetch_empty_for_program(
    rpc: &RpcClient,
    wallet: &Pubkey,
    program: TokenProgramKind,
) -> Result<Vec<CandidateAccount>, ClaimError> {
    let records = rpc
        .get_token_accounts_by_owner(wallet, TokenAccountsFilter::ProgramId(program.program_id()))
        .await
        .map_err(|e| {
            ClaimError::Discovery(format!(
                "listing {} accounts failed: {e}",
                program.as_str()
            ))
        })?;

    let out: Vec<CandidateAccount> = records
        .iter()
        .filter_map(|rec| candidate_from_record(wallet, program, rec))
        .collect();

    debug!(
        "{}: {} records, {} empty candidates",
        program.as_str(),
        records.len(),
        out.len()
    );
    Ok(out)
}

/// Scan both token programs and merge, sorted by rent descending. If either
/// fetch fails the whole scan fails.
pub async fn scan_empty_accounts(
    rpc: &RpcClient,
    wallet: &Pubkey,
) -> Result<Vec<CandidateAccount>, ClaimError> {
    let (legacy, t22) = tokio::try_join!(
        fetch_empty_for_program(rpc, wallet, TokenProgramKind::Legacy),
        fetch_empty_for_program(rpc, wallet, TokenProgramKind::Token2022),
    )?;

    let mut merged = legacy;
    merged.extend(t22);
    merged.sort_by(|a, b| b.lamports.cmp(&a.lamports));
    Ok(merged)
}
