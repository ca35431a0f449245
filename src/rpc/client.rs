use ethers::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub type WsClient = Provider<Ws>;
pub type SignedClient = SignerMiddleware<WsClient, LocalWallet>;

/// Open a WebSocket provider. `poll_interval` paces ethers' own polling
/// (pending transactions, filters).
pub async fn connect(url: &str, poll_interval: Duration) -> eyre::Result<WsClient> {
    let start = Instant::now();
    let ws = Ws::connect(url).await?;
    let provider = Provider::new(ws).interval(poll_interval);

    let block = provider.get_block_number().await?;
    info!(
        "Connected to RPC: {} (block {}, {}ms)",
        url,
        block,
        start.elapsed().as_millis()
    );
    Ok(provider)
}

/// Refuse to sign for a chain other than the configured one.
pub async fn verify_chain_id(provider: &WsClient, expected: u64) -> eyre::Result<()> {
    let actual = provider.get_chainid().await?;
    if actual != U256::from(expected) {
        warn!("RPC reports chain {}, config expects {}", actual, expected);
        eyre::bail!("chain id mismatch: node {} vs config {}", actual, expected);
    }
    Ok(())
}

/// Wrap the provider with a local signer bound to `chain_id`.
pub fn signed_client(provider: WsClient, wallet: LocalWallet, chain_id: u64) -> Arc<SignedClient> {
    let wallet = wallet.with_chain_id(chain_id);
    info!("Wallet loaded: {:?}", wallet.address());
    Arc::new(SignerMiddleware::new(provider, wallet))
}
