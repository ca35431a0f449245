use ethers::types::Address;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    pub contracts: ContractConfig,
    pub gas: GasConfig,
    pub execution: ExecutionConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub chain_id: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    pub factory: String,
    pub usd_depositer: String,
    pub btc_depositer: String,
    /// LP token of the USD base pool; a metapool whose second coin is this
    /// token routes through the USD depositer
    pub usd_base_lp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    pub oracle_url: String,
    pub oracle_timeout_ms: u64,
    /// Used whenever the oracle lookup fails
    pub default_gwei: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Downward tolerance applied to deposit/swap quotes, in basis points
    pub slippage_bps: u64,
    /// Confirmations tracked per transaction before the stream closes
    pub confirmation_depth: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub summary_interval_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        let mut config = Self::load("config.toml").unwrap_or_else(|_| Self::default());
        config.apply_env();
        config
    }

    /// Environment wins over the file.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RPC_URL") {
            self.rpc.url = url;
        }
        if let Ok(url) = std::env::var("GAS_ORACLE_URL") {
            self.gas.oracle_url = url;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rpc: RpcConfig {
                url: std::env::var("RPC_URL")
                    .unwrap_or_else(|_| "wss://ethereum-rpc.publicnode.com".into()),
                chain_id: 1,
                poll_interval_ms: 4000,
            },
            contracts: ContractConfig {
                // Mainnet metapool factory and its zaps
                factory: "0xfD6f33A0509ec67dEFc500755322aBd9Df1bD5B8".into(),
                usd_depositer: "0xa79828df1850e8a3a3064576f380d90aecdd3359".into(),
                btc_depositer: "0x7abdbaf29929e7f8621b757d2a7c04d78d633834".into(),
                usd_base_lp: "0x6c3F90f043a72FA612cbac8115EE7e52BDe6E490".into(), // 3CRV
            },
            gas: GasConfig {
                oracle_url: std::env::var("GAS_ORACLE_URL")
                    .unwrap_or_else(|_| "https://gasprice.poa.network/".into()),
                oracle_timeout_ms: 3000,
                default_gwei: "70".into(),
            },
            execution: ExecutionConfig {
                slippage_bps: 500, // 5%
                confirmation_depth: 1,
            },
            monitoring: MonitoringConfig {
                log_level: "info".into(),
                summary_interval_secs: 300,
            },
        }
    }
}

/// Parsed addresses and typed values for runtime use
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    pub contracts: ParsedContracts,
    pub gas: GasSettings,
    pub slippage_bps: u64,
    pub confirmation_depth: u64,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedContracts {
    pub factory: Address,
    pub usd_depositer: Address,
    pub btc_depositer: Address,
    pub usd_base_lp: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasSettings {
    pub oracle_url: String,
    pub timeout: Duration,
    pub default_gwei: String,
}

impl ParsedConfig {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        if config.execution.slippage_bps > 10_000 {
            eyre::bail!(
                "slippage_bps must be at most 10000, got {}",
                config.execution.slippage_bps
            );
        }
        if config.gas.default_gwei.parse::<f64>().is_err() {
            eyre::bail!("default_gwei is not numeric: {:?}", config.gas.default_gwei);
        }

        Ok(ParsedConfig {
            contracts: ParsedContracts {
                factory: config.contracts.factory.parse()?,
                usd_depositer: config.contracts.usd_depositer.parse()?,
                btc_depositer: config.contracts.btc_depositer.parse()?,
                usd_base_lp: config.contracts.usd_base_lp.parse()?,
            },
            gas: GasSettings {
                oracle_url: config.gas.oracle_url.clone(),
                timeout: Duration::from_millis(config.gas.oracle_timeout_ms),
                default_gwei: config.gas.default_gwei.clone(),
            },
            slippage_bps: config.execution.slippage_bps,
            confirmation_depth: config.execution.confirmation_depth,
            poll_interval: Duration::from_millis(config.rpc.poll_interval_ms),
        })
    }
}
