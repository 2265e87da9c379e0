use solana_sdk::pubkey::Pubkey;
use std::env;
use std::str::FromStr;

use crate::error::ClaimError;
use crate::params::{
    DEFAULT_FEE_BPS, DEFAULT_KEYPAIR_FILENAME, DEFAULT_MAX_ACCOUNTS_PER_TX, DEFAULT_RPC_URL,
    MAX_ACCOUNTS_PER_TX_LIMIT, MAX_FEE_BPS,
};

/// Engine configuration, read from the environment exactly once at startup
/// and range-checked here — no component reads env vars after this point.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub rpc_url: String,
    pub keypair_path: String,
    /// Absent ⇒ zero-fee mode, no transfer instruction is ever built.
    pub fee_recipient: Option<Pubkey>,
    pub fee_bps: u16,
    pub max_accounts_per_tx: usize,
}

impl EngineConfig {
    /// Variables: `RPC_URL`, `KEYPAIR_FILENAME`, `FEE_RECIPIENT`, `FEE_BPS`,
    /// `MAX_ACCOUNTS_PER_TX`. Call `dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ClaimError> {
        let rpc_url = env::var("RPC_URL")
            .or_else(|_| env::var("HELIUS_HTTP"))
            .unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());

        let keypair_path =
            env::var("KEYPAIR_FILENAME").unwrap_or_else(|_| DEFAULT_KEYPAIR_FILENAME.to_string());

        // Empty string means the operator runs without a fee, like an unset
        // variable. A non-empty value that does not parse is a config error,
        // not silence.
        let fee_recipient = match env::var("FEE_RECIPIENT") {
            Ok(s) if !s.trim().is_empty() => Some(Pubkey::from_str(s.trim()).map_err(|e| {
                ClaimError::Validation(format!("FEE_RECIPIENT is not a valid pubkey: {e}"))
            })?),
            _ => None,
        };

        let fee_bps = match env::var("FEE_BPS") {
            Ok(s) => s
                .parse::<u16>()
                .map_err(|e| ClaimError::Validation(format!("FEE_BPS: {e}")))?,
            Err(_) => DEFAULT_FEE_BPS,
        };

        let max_accounts_per_tx = match env::var("MAX_ACCOUNTS_PER_TX") {
            Ok(s) => s
                .parse::<usize>()
                .map_err(|e| ClaimError::Validation(format!("MAX_ACCOUNTS_PER_TX: {e}")))?,
            Err(_) => DEFAULT_MAX_ACCOUNTS_PER_TX,
        };

        Self {
            rpc_url,
            keypair_path,
            fee_recipient,
            fee_bps,
            max_accounts_per_tx,
        }
        .validated()
    }

    pub fn validated(self) -> Result<Self, ClaimError> {
        if self.fee_bps > MAX_FEE_BPS {
            return Err(ClaimError::Validation(format!(
                "FEE_BPS {} out of range 0..={}",
                self.fee_bps, MAX_FEE_BPS
            )));
        }
        if self.max_accounts_per_tx == 0 || self.max_accounts_per_tx > MAX_ACCOUNTS_PER_TX_LIMIT {
            return Err(ClaimError::Validation(format!(
                "MAX_ACCOUNTS_PER_TX {} out of range 1..={}",
                self.max_accounts_per_tx, MAX_ACCOUNTS_PER_TX_LIMIT
            )));
        }
        Ok(self)
    }

    /// Fee is charged only when a recipient is configured AND the rate is
    /// nonzero; either alone leaves the engine in zero-fee mode.
    pub fn fee_configured(&self) -> bool {
        self.fee_recipient.is_some() && self.fee_bps > 0
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            keypair_path: DEFAULT_KEYPAIR_FILENAME.to_string(),
            fee_recipient: None,
            fee_bps: DEFAULT_FEE_BPS,
            max_accounts_per_tx: DEFAULT_MAX_ACCOUNTS_PER_TX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(EngineConfig::default().validated().is_ok());
    }

    #[test]
    fn fee_bps_over_10000_is_rejected() {
        let cfg = EngineConfig {
            fee_bps: 10_001,
            ..Default::default()
        };
        assert!(matches!(cfg.validated(), Err(ClaimError::Validation(_))));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let cfg = EngineConfig {
            max_accounts_per_tx: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validated(), Err(ClaimError::Validation(_))));
    }

    #[test]
    fn fee_mode_requires_recipient_and_nonzero_rate() {
        let mut cfg = EngineConfig::default();
        assert!(!cfg.fee_configured()); // recipient absent

        cfg.fee_recipient = Some(Pubkey::new_unique());
        assert!(cfg.fee_configured());

        cfg.fee_bps = 0;
        assert!(!cfg.fee_configured());
    }
}
