use anyhow::{anyhow, Result};
use dotenv::dotenv;
use log::error;
use solana_sdk::native_token::lamports_to_sol;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::read_keypair_file;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

use solint_reclaim::fees::pct_from_bps;
use solint_reclaim::types::ClaimProgress;
use solint_reclaim::utils;
use solint_reclaim::{ClaimEngine, EngineConfig, SessionState};

fn short_pk(pk: &Pubkey) -> String {
    let s = pk.to_string();
    format!("{}…{}", &s[..6], &s[s.len() - 4..])
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    // 1) Конфиг, кошелёк, RPC
    let config = EngineConfig::from_env()?;
    let wallet = read_keypair_file(&config.keypair_path)
        .map_err(|e| anyhow!("read_keypair_file({}): {}", config.keypair_path, e))?;
    let owner = Signer::pubkey(&wallet);
    let rpc = utils::init_rpc(&config.rpc_url);

    let balance_before = rpc.get_balance(&owner).await?;
    println!(
        "Wallet {} — {:.4} SOL",
        short_pk(&owner),
        lamports_to_sol(balance_before)
    );

    // 2) Скан пустых токен-аккаунтов
    let mut engine = ClaimEngine::new(rpc.clone(), config.clone()).with_signer(Arc::new(wallet));
    let found = engine.scan(&owner).await?;
    if found.is_empty() {
        println!("No empty token accounts — wallet is already clean ✅");
        return Ok(());
    }

    println!("Found {} empty token accounts:", found.len());
    for c in found {
        println!(
            "  • {}  {:<9} mint {}  {:.6} SOL",
            short_pk(&c.address),
            c.program.as_str(),
            short_pk(&c.mint),
            lamports_to_sol(c.lamports),
        );
    }

    // 3) Превью: claim всего найденного
    let mut selection: Vec<Pubkey> = found.iter().map(|c| c.address).collect();
    let preview = engine.preview_fees(&selection);
    println!(
        "Selected {} accounts ({}), fee rate {}",
        selection.len(),
        preview,
        if config.fee_configured() {
            pct_from_bps(config.fee_bps)
        } else {
            "0.00%".to_string()
        },
    );

    // 4) Claim с прогрессом по батчам
    let (tx_progress, mut rx_progress) = unbounded_channel::<ClaimProgress>();
    let printer = tokio::spawn(async move {
        while let Some(p) = rx_progress.recv().await {
            match &p.detail {
                Some(d) => println!("batch {}/{} — {} ({})", p.index, p.total, p.status.as_str(), d),
                None => println!("batch {}/{} — {}", p.index, p.total, p.status.as_str()),
            }
        }
    });

    let session = engine.run_claim(&mut selection, Some(tx_progress)).await?;
    printer.await?;

    // 5) Итог
    println!("{session}");
    if session.state == SessionState::Aborted {
        if let Some(err) = &session.failure {
            error!("claim aborted: {err}");
        }
    }

    let balance_after = rpc.get_balance(&owner).await?;
    println!(
        "Wallet balance: {:.4} SOL → {:.4} SOL",
        lamports_to_sol(balance_before),
        lamports_to_sol(balance_after)
    );

    Ok(())
}
