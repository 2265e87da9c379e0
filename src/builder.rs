//! Per-batch transaction assembly.
//!
//! Balances are re-read right before building: scan-time lamports are only
//! estimates and the fee transfer must be sized from what the closes will
//! actually recover. Everything lands in ONE transaction — N closes plus at
//! most one fee transfer — so a failed close can never leave the fee charged.

use anyhow::{bail, Result};
use log::{debug, warn};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;

use crate::config::EngineConfig;
use crate::fees::compute_fee;
use crate::params::CLAIM_COMPUTE_UNIT_LIMIT;
use crate::types::{CandidateAccount, TokenProgramKind};
use crate::utils::op;

/// One batch, ready to simulate and sign. Lamport figures are authoritative
/// here (recomputed from the re-fetched balances), unlike the partition-time
/// estimates.
#[derive(Debug)]
pub struct BuiltBatch {
    pub tx: Transaction,
    pub close_count: usize,
    pub gross_lamports: u64,
    pub fee_lamports: u64,
    pub net_lamports: u64,
    /// Confirmation waits give up once the chain passes this height.
    pub last_valid_block_height: u64,
}

/// Close instructions for every account (rent back to the wallet, authorized
/// by the wallet, routed through the account's own token program), preceded
/// by the fee transfer when one applies. Omitting the fee leg is the valid
/// zero-fee mode, not an error.
pub fn assemble_instructions(
    wallet: &Pubkey,
    accounts: &[CandidateAccount],
    fee_recipient: Option<&Pubkey>,
    fee_lamports: u64,
) -> Result<Vec<Instruction>> {
    let mut ixs: Vec<Instruction> = Vec::with_capacity(accounts.len() + 2);
    ixs.push(ComputeBudgetInstruction::set_compute_unit_limit(
        CLAIM_COMPUTE_UNIT_LIMIT,
    ));

    if let (Some(recipient), true) = (fee_recipient, fee_lamports > 0) {
        ixs.push(system_instruction::transfer(wallet, recipient, fee_lamports));
    }

    for acc in accounts {
        let ix = match acc.program {
            TokenProgramKind::Legacy => spl_token::instruction::close_account(
                &spl_token::id(),
                &acc.address,
                wallet,
                wallet,
                &[],
            )
            .map_err(op("close_account (spl-token)"))?,
            TokenProgramKind::Token2022 => spl_token_2022::instruction::close_account(
                &spl_token_2022::id(),
                &acc.address,
                wallet,
                wallet,
                &[],
            )
            .map_err(op("close_account (token-2022)"))?,
        };
        ixs.push(ix);
    }

    Ok(ixs)
}

/// Re-fetch the batch accounts and keep the ones still worth closing.
/// Accounts that vanished since the scan (closed elsewhere) are dropped;
/// a close against a gone account would fail the whole transaction.
async fn refresh_batch(
    rpc: &RpcClient,
    accounts: &[CandidateAccount],
) -> Result<Vec<CandidateAccount>> {
    let addresses: Vec<Pubkey> = accounts.iter().map(|a| a.address).collect();
    let fetched = rpc
        .get_multiple_accounts(&addresses)
        .await
        .map_err(op("get_multiple_accounts"))?;

    let mut live = Vec::with_capacity(accounts.len());
    for (cand, raw) in accounts.iter().zip(fetched) {
        match raw {
            Some(acc) if acc.lamports > 0 => {
                let mut cand = cand.clone();
                if cand.lamports != acc.lamports {
                    debug!(
                        "{}: lamports drifted {} → {}",
                        cand.address, cand.lamports, acc.lamports
                    );
                    cand.lamports = acc.lamports;
                }
                live.push(cand);
            }
            _ => warn!("{}: gone since scan, dropping from batch", cand.address),
        }
    }
    Ok(live)
}

/// Build the atomic transaction for one batch. `Ok(None)` means every account
/// of the batch vanished since the scan and there is nothing to submit.
pub async fn build_batch_transaction(
    rpc: &RpcClient,
    wallet: &Pubkey,
    accounts: &[CandidateAccount],
    config: &EngineConfig,
) -> Result<Option<BuiltBatch>> {
    let live = refresh_batch(rpc, accounts).await?;
    if live.is_empty() {
        return Ok(None);
    }

    let gross_lamports: u64 = live.iter().map(|a| a.lamports).sum();
    let (fee_lamports, net_lamports) =
        compute_fee(gross_lamports, config.fee_bps, config.fee_configured());

    let ixs = assemble_instructions(
        wallet,
        &live,
        config.fee_recipient.as_ref(),
        fee_lamports,
    )?;

    let (blockhash, last_valid_block_height) = rpc
        .get_latest_blockhash_with_commitment(rpc.commitment())
        .await
        .map_err(op("get_latest_blockhash"))?;

    let message = Message::new_with_blockhash(&ixs, Some(wallet), &blockhash);
    let tx = Transaction::new_unsigned(message);

    // fail closed on a misconfigured batch size, before simulation
    let wire_size = bincode::serialize(&tx).map_err(op("serialize transaction"))?.len();
    if wire_size > PACKET_DATA_SIZE {
        bail!(
            "batch of {} closes serializes to {} bytes (limit {}); lower MAX_ACCOUNTS_PER_TX",
            live.len(),
            wire_size,
            PACKET_DATA_SIZE
        );
    }

    Ok(Some(BuiltBatch {
        tx,
        close_count: live.len(),
        gross_lamports,
        fee_lamports,
        net_lamports,
        last_valid_block_height,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MAX_ACCOUNTS_PER_TX_LIMIT;
    use solana_sdk::hash::Hash;

    fn batch(n: usize, program: TokenProgramKind) -> Vec<CandidateAccount> {
        (0..n)
            .map(|_| CandidateAccount {
                address: Pubkey::new_unique(),
                program,
                mint: Pubkey::new_unique(),
                lamports: 2_039_280,
            })
            .collect()
    }

    #[test]
    fn fee_leg_comes_first_and_once() {
        let wallet = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let accounts = batch(3, TokenProgramKind::Legacy);

        let ixs = assemble_instructions(&wallet, &accounts, Some(&recipient), 61_178).unwrap();
        // compute budget, fee transfer, then 3 closes
        assert_eq!(ixs.len(), 5);
        assert_eq!(ixs[1].program_id, solana_sdk::system_program::id());
        for ix in &ixs[2..] {
            assert_eq!(ix.program_id, spl_token::id());
        }
    }

    #[test]
    fn zero_fee_mode_has_no_transfer() {
        let wallet = Pubkey::new_unique();
        let accounts = batch(2, TokenProgramKind::Token2022);

        let ixs = assemble_instructions(&wallet, &accounts, None, 0).unwrap();
        assert_eq!(ixs.len(), 3);
        for ix in &ixs[1..] {
            assert_eq!(ix.program_id, spl_token_2022::id());
        }
    }

    #[test]
    fn configured_recipient_with_zero_fee_still_skips_the_transfer() {
        let wallet = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let accounts = batch(1, TokenProgramKind::Legacy);

        let ixs = assemble_instructions(&wallet, &accounts, Some(&recipient), 0).unwrap();
        assert_eq!(ixs.len(), 2);
    }

    #[test]
    fn close_routes_rent_and_authority_to_the_wallet() {
        let wallet = Pubkey::new_unique();
        let accounts = batch(1, TokenProgramKind::Legacy);

        let ixs = assemble_instructions(&wallet, &accounts, None, 0).unwrap();
        let close = &ixs[1];
        assert_eq!(close.accounts[0].pubkey, accounts[0].address);
        assert_eq!(close.accounts[1].pubkey, wallet); // destination
        assert_eq!(close.accounts[2].pubkey, wallet); // authority
    }

    #[test]
    fn a_full_batch_fits_in_one_packet() {
        let wallet = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let accounts = batch(MAX_ACCOUNTS_PER_TX_LIMIT, TokenProgramKind::Legacy);

        let ixs = assemble_instructions(&wallet, &accounts, Some(&recipient), 1_000_000).unwrap();
        let message = Message::new_with_blockhash(&ixs, Some(&wallet), &Hash::default());
        let tx = Transaction::new_unsigned(message);
        assert!(bincode::serialize(&tx).unwrap().len() <= PACKET_DATA_SIZE);
    }
}
