use anyhow::anyhow;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::sync::Arc;

/// Вспомогательная функция для единообразного маппинга ошибок.
pub fn op<E: std::fmt::Display>(ctx: &'static str) -> impl FnOnce(E) -> anyhow::Error {
    move |e| anyhow!("{} failed: {}", ctx, e)
}

pub fn init_rpc(url: &str) -> Arc<RpcClient> {
    Arc::new(RpcClient::new_with_commitment(
        url.to_string(),
        CommitmentConfig::confirmed(),
    ))
}
