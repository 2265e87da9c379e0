// src/params.rs

use tokio::time::Duration;

/// RPC URL для Mainnet-Beta
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Файл keypair в ~/.config/solana/
pub const DEFAULT_KEYPAIR_FILENAME: &str = "mainnet-id.json";

/// Default service fee: 300 bps = 3% of reclaimed rent, charged per batch.
pub const DEFAULT_FEE_BPS: u16 = 300;

/// Fee rate is expressed in basis points; 10_000 bps = 100%.
pub const MAX_FEE_BPS: u16 = 10_000;

/// How many close instructions go into one transaction by default.
/// 12 keeps a margin under the 1232-byte packet limit even with the fee
/// transfer attached; the builder re-checks the serialized size before
/// anything is sent.
pub const DEFAULT_MAX_ACCOUNTS_PER_TX: usize = 12;

/// Hard cap for the configurable batch size.
pub const MAX_ACCOUNTS_PER_TX_LIMIT: usize = 24;

/// Интервал опроса статуса транзакции
pub const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Compute-unit limit prepended to every claim transaction.
pub const CLAIM_COMPUTE_UNIT_LIMIT: u32 = 400_000;
