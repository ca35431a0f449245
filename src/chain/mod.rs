//! Wallet provider boundary.
//!
//! The rest of the crate talks to the chain only through [`ChainClient`]:
//! typed reads against the factory, ERC20, metapool and depositer contracts,
//! plus sends that hand back a transaction hash and a stream of
//! confirmation counts. [`EthersChain`] is the production implementation.

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use futures::stream::BoxStream;
use thiserror::Error;

pub mod abi;
pub mod provider;

#[cfg(test)]
pub mod mock;

pub use provider::EthersChain;

/// Gateway calls always carry four underlying amounts.
pub const GATEWAY_COINS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Error reported by the node or the wallet, carrying its message
    #[error("{0}")]
    Provider(String),
    /// Transaction was mined with a failing status
    #[error("transaction {0:?} reverted")]
    Reverted(TxHash),
}

/// Confirmation counts for a submitted transaction, starting at 1 once mined.
pub type Confirmations = BoxStream<'static, Result<u64, ChainError>>;

/// A transaction accepted by the provider.
pub struct Submission {
    pub hash: TxHash,
    pub confirmations: Confirmations,
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission").field("hash", &self.hash).finish_non_exhaustive()
    }
}

/// Sender and legacy gas price for a value-moving call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub from: Address,
    pub gas_price: U256,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    // Factory
    async fn pool_count(&self, factory: Address) -> Result<U256, ChainError>;
    async fn pool_list(&self, factory: Address, index: U256) -> Result<Address, ChainError>;
    async fn get_coins(&self, factory: Address, pool: Address) -> Result<Vec<Address>, ChainError>;

    // ERC20
    async fn symbol(&self, token: Address) -> Result<String, ChainError>;
    async fn name(&self, token: Address) -> Result<String, ChainError>;
    async fn decimals(&self, token: Address) -> Result<u8, ChainError>;
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError>;
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError>;

    // Metapool
    async fn get_dy(&self, pool: Address, i: i128, j: i128, dx: U256) -> Result<U256, ChainError>;
    async fn exchange(
        &self,
        pool: Address,
        i: i128,
        j: i128,
        dx: U256,
        min_dy: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError>;

    // Liquidity gateway
    async fn calc_token_amount(
        &self,
        gateway: Address,
        pool: Address,
        amounts: [U256; GATEWAY_COINS],
        is_deposit: bool,
    ) -> Result<U256, ChainError>;
    async fn add_liquidity(
        &self,
        gateway: Address,
        pool: Address,
        amounts: [U256; GATEWAY_COINS],
        min_mint_amount: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError>;
    async fn remove_liquidity(
        &self,
        gateway: Address,
        pool: Address,
        burn_amount: U256,
        min_amounts: [U256; GATEWAY_COINS],
        opts: TxOptions,
    ) -> Result<Submission, ChainError>;
    async fn calc_withdraw_one_coin(
        &self,
        gateway: Address,
        pool: Address,
        burn_amount: U256,
        i: i128,
    ) -> Result<U256, ChainError>;
    async fn remove_liquidity_one_coin(
        &self,
        gateway: Address,
        pool: Address,
        burn_amount: U256,
        i: i128,
        min_amount: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError>;
}
