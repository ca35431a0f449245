// Use mimalloc for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use metapool_client::chain::{ChainClient, EthersChain};
use metapool_client::config::{Config, ParsedConfig};
use metapool_client::directory::PoolDirectory;
use metapool_client::gas::GasPriceResolver;
use metapool_client::monitor::Monitor;
use metapool_client::rpc;
use metapool_client::types::Account;
use metapool_client::{Action, Dispatcher, EventBus, Orchestrator, Store};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::load_or_default();
    let parsed = ParsedConfig::from_config(&config)?;

    // Initialize logging; RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.monitoring.log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("═══════════════════════════════════════════");
    info!("    METAPOOL CLIENT v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");
    info!("Configuration loaded");
    info!("  Factory:  {:?}", parsed.contracts.factory);
    info!("  Slippage: {}bps", parsed.slippage_bps);
    info!("  Gas:      {} (fallback {} gwei)", parsed.gas.oracle_url, parsed.gas.default_gwei);

    let provider = rpc::connect(&config.rpc.url, parsed.poll_interval).await?;
    rpc::verify_chain_id(&provider, config.rpc.chain_id).await?;

    // Initialize wallet
    let private_key = std::env::var("PRIVATE_KEY")
        .map_err(|_| eyre::eyre!("PRIVATE_KEY environment variable required"))?;
    let wallet: LocalWallet = private_key.parse()?;
    let account = Account::new(wallet.address());
    let signer = rpc::signed_client(provider, wallet, config.rpc.chain_id);

    let chain: Arc<dyn ChainClient> = Arc::new(EthersChain::new(
        signer,
        parsed.poll_interval,
        parsed.confirmation_depth,
    ));

    // Initialize components
    let store = Arc::new(Store::new(EventBus::default()));
    let monitor = Arc::new(Monitor::new());
    let summary_every = Duration::from_secs(config.monitoring.summary_interval_secs.max(1));
    tokio::spawn(monitor.clone().run(store.events().subscribe(), summary_every));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(PoolDirectory::new(&parsed.contracts)),
        Arc::new(GasPriceResolver::new(&parsed.gas)?),
        parsed.slippage_bps,
    ));

    store.connect(account, chain);
    if let Err(e) = orchestrator.configure().await {
        warn!("Initial configure failed: {}", e);
    }

    let pools = store.pools();
    info!("Discovered {} pools", pools.len());
    for pool in pools.iter() {
        let assets: Vec<&str> = pool.assets.iter().map(|a| a.symbol.as_str()).collect();
        info!(
            "  {} {:?} via {} gateway | LP balance {} | {:?}",
            pool.symbol, pool.address, pool.liquidity.kind, pool.balance, assets
        );
    }

    let (actions, dispatcher) = Dispatcher::new(orchestrator);
    let dispatcher = tokio::spawn(dispatcher.run());

    // Spawn balance refresh task
    let refresh = actions.clone();
    let refresher = tokio::spawn(async move {
        let mut interval = interval(summary_every);
        // Don't fire immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if refresh.send(Action::GetBalances).is_err() {
                break;
            }
        }
    });

    info!("Running, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    // Close every sender, then let in-flight actions finish
    refresher.abort();
    let _ = refresher.await;
    drop(actions);
    if let Err(e) = dispatcher.await {
        warn!("Dispatcher ended abnormally: {}", e);
    }
    store.disconnect();
    monitor.log_summary().await;

    Ok(())
}
