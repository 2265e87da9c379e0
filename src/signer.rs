//! The engine never touches key material; it hands a fully-built transaction
//! to whatever implements [`ClaimSigner`] and gets it back signed or not.

use anyhow::Result;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

use crate::utils::op;

/// External signer capability. An `Err` means the signer declined or failed;
/// the orchestrator treats it like a failed simulation and aborts the
/// remaining batches.
pub trait ClaimSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign `tx` over the blockhash it already carries.
    fn sign(&self, tx: Transaction) -> Result<Transaction>;
}

/// Local-keypair signer used by the CLI runner.
impl ClaimSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    fn sign(&self, mut tx: Transaction) -> Result<Transaction> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[self], blockhash).map_err(op("sign transaction"))?;
        Ok(tx)
    }
}
