use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Liquidity gateway family. Factory metapools are paired either with the USD
/// base pool or the BTC base pool, and each family has its own depositer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayKind {
    Usd,
    Btc,
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayKind::Usd => write!(f, "USD"),
            GatewayKind::Btc => write!(f, "BTC"),
        }
    }
}

/// Depositer contract a pool routes multi-asset deposits and withdrawals through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityGateway {
    pub address: Address,
    pub kind: GatewayKind,
}

/// One constituent coin of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Position in the pool's coin list; used as `i`/`j` in exchange calls
    pub index: usize,
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    /// Account balance, decimal-scaled and rounded down
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    /// Account's LP token balance, decimal-scaled and rounded down
    pub balance: String,
    pub assets: Vec<Asset>,
    pub liquidity: LiquidityGateway,
}

impl Pool {
    pub fn asset(&self, index: usize) -> Option<&Asset> {
        self.assets.get(index)
    }
}

/// Connected wallet identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

/// Expected result of a swap, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub send_amount: String,
    pub receive_amount: String,
    pub receive_per_send: f64,
    pub send_per_receive: f64,
}

/// A value-moving request against one pool. Amounts are human-readable
/// decimal strings; they are scaled to base units inside the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Deposit the first two pool assets through the liquidity gateway.
    Deposit {
        pool: Pool,
        first_amount: String,
        second_amount: String,
    },
    /// Burn LP tokens for a proportional share of the pool assets.
    Withdraw { pool: Pool, amount: String },
    /// Burn LP tokens for a single pool asset.
    WithdrawOneCoin {
        pool: Pool,
        asset: Asset,
        amount: String,
    },
    /// Exchange `amount` of `from` for `to` directly on the pool.
    Swap {
        pool: Pool,
        from: Asset,
        to: Asset,
        amount: String,
    },
}

impl Intent {
    pub fn pool(&self) -> &Pool {
        match self {
            Intent::Deposit { pool, .. }
            | Intent::Withdraw { pool, .. }
            | Intent::WithdrawOneCoin { pool, .. }
            | Intent::Swap { pool, .. } => pool,
        }
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Deposit { .. } => IntentKind::Deposit,
            Intent::Withdraw { .. } => IntentKind::Withdraw,
            Intent::WithdrawOneCoin { .. } => IntentKind::WithdrawOneCoin,
            Intent::Swap { .. } => IntentKind::Swap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    Deposit,
    Withdraw,
    WithdrawOneCoin,
    Swap,
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentKind::Deposit => write!(f, "deposit"),
            IntentKind::Withdraw => write!(f, "withdraw"),
            IntentKind::WithdrawOneCoin => write!(f, "withdraw-one-coin"),
            IntentKind::Swap => write!(f, "swap"),
        }
    }
}
