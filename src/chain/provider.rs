use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::{Address, TxHash, U256};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::abi::{CurveFactory, Depositer, Erc20, MetaPool};
use super::{ChainClient, ChainError, Confirmations, Submission, TxOptions, GATEWAY_COINS};

/// [`ChainClient`] backed by an ethers middleware stack. Sends go through the
/// middleware's signer; confirmations are derived by polling the receipt and
/// the chain head.
pub struct EthersChain<M> {
    client: Arc<M>,
    poll_interval: Duration,
    confirmation_depth: u64,
}

impl<M: Middleware + 'static> EthersChain<M> {
    pub fn new(client: Arc<M>, poll_interval: Duration, confirmation_depth: u64) -> Self {
        Self {
            client,
            poll_interval,
            confirmation_depth: confirmation_depth.max(1),
        }
    }

    /// Emit confirmation counts 1, 2, ... up to the configured depth, one per
    /// step even if several blocks land between polls.
    fn track(&self, hash: TxHash) -> Confirmations {
        let client = self.client.clone();
        let interval = self.poll_interval;
        let depth = self.confirmation_depth;

        futures::stream::unfold(Some(0u64), move |state| {
            let client = client.clone();
            async move {
                let emitted = state?;
                let next = emitted + 1;

                loop {
                    tokio::time::sleep(interval).await;

                    let receipt = match client.get_transaction_receipt(hash).await {
                        Ok(Some(receipt)) => receipt,
                        Ok(None) => continue,
                        Err(e) => return Some((Err(ChainError::Provider(e.to_string())), None)),
                    };

                    if receipt.status == Some(0u64.into()) {
                        return Some((Err(ChainError::Reverted(hash)), None));
                    }

                    let Some(mined_at) = receipt.block_number else {
                        continue;
                    };

                    let head = match client.get_block_number().await {
                        Ok(head) => head,
                        Err(e) => return Some((Err(ChainError::Provider(e.to_string())), None)),
                    };

                    let count = head.as_u64().saturating_sub(mined_at.as_u64()) + 1;
                    if count >= next {
                        debug!("{:?} confirmation {}", hash, next);
                        let state = if next >= depth { None } else { Some(next) };
                        return Some((Ok(next), state));
                    }
                }
            }
        })
        .boxed()
    }

    fn submitted(&self, hash: TxHash) -> Submission {
        Submission {
            hash,
            confirmations: self.track(hash),
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainClient for EthersChain<M> {
    async fn pool_count(&self, factory: Address) -> Result<U256, ChainError> {
        let contract = CurveFactory::new(factory, self.client.clone());
        contract.pool_count().call().await.map_err(describe)
    }

    async fn pool_list(&self, factory: Address, index: U256) -> Result<Address, ChainError> {
        let contract = CurveFactory::new(factory, self.client.clone());
        contract.pool_list(index).call().await.map_err(describe)
    }

    async fn get_coins(&self, factory: Address, pool: Address) -> Result<Vec<Address>, ChainError> {
        let contract = CurveFactory::new(factory, self.client.clone());
        let coins = contract.get_coins(pool).call().await.map_err(describe)?;
        Ok(coins.to_vec())
    }

    async fn symbol(&self, token: Address) -> Result<String, ChainError> {
        let contract = Erc20::new(token, self.client.clone());
        contract.symbol().call().await.map_err(describe)
    }

    async fn name(&self, token: Address) -> Result<String, ChainError> {
        let contract = Erc20::new(token, self.client.clone());
        contract.name().call().await.map_err(describe)
    }

    async fn decimals(&self, token: Address) -> Result<u8, ChainError> {
        let contract = Erc20::new(token, self.client.clone());
        contract.decimals().call().await.map_err(describe)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        let contract = Erc20::new(token, self.client.clone());
        contract.balance_of(owner).call().await.map_err(describe)
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let contract = Erc20::new(token, self.client.clone());
        contract
            .allowance(owner, spender)
            .from(owner)
            .call()
            .await
            .map_err(describe)
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        let contract = Erc20::new(token, self.client.clone());
        let call = contract
            .approve(spender, amount)
            .from(opts.from)
            .gas_price(opts.gas_price);
        let pending = call.send().await.map_err(describe)?;
        Ok(self.submitted(pending.tx_hash()))
    }

    async fn get_dy(&self, pool: Address, i: i128, j: i128, dx: U256) -> Result<U256, ChainError> {
        let contract = MetaPool::new(pool, self.client.clone());
        contract.get_dy(i, j, dx).call().await.map_err(describe)
    }

    async fn exchange(
        &self,
        pool: Address,
        i: i128,
        j: i128,
        dx: U256,
        min_dy: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        let contract = MetaPool::new(pool, self.client.clone());
        let call = contract
            .exchange(i, j, dx, min_dy)
            .from(opts.from)
            .gas_price(opts.gas_price);
        let pending = call.send().await.map_err(describe)?;
        Ok(self.submitted(pending.tx_hash()))
    }

    async fn calc_token_amount(
        &self,
        gateway: Address,
        pool: Address,
        amounts: [U256; GATEWAY_COINS],
        is_deposit: bool,
    ) -> Result<U256, ChainError> {
        let contract = Depositer::new(gateway, self.client.clone());
        contract
            .calc_token_amount(pool, amounts, is_deposit)
            .call()
            .await
            .map_err(describe)
    }

    async fn add_liquidity(
        &self,
        gateway: Address,
        pool: Address,
        amounts: [U256; GATEWAY_COINS],
        min_mint_amount: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        let contract = Depositer::new(gateway, self.client.clone());
        let call = contract
            .add_liquidity(pool, amounts, min_mint_amount)
            .from(opts.from)
            .gas_price(opts.gas_price);
        let pending = call.send().await.map_err(describe)?;
        Ok(self.submitted(pending.tx_hash()))
    }

    async fn remove_liquidity(
        &self,
        gateway: Address,
        pool: Address,
        burn_amount: U256,
        min_amounts: [U256; GATEWAY_COINS],
        opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        let contract = Depositer::new(gateway, self.client.clone());
        let call = contract
            .remove_liquidity(pool, burn_amount, min_amounts)
            .from(opts.from)
            .gas_price(opts.gas_price);
        let pending = call.send().await.map_err(describe)?;
        Ok(self.submitted(pending.tx_hash()))
    }

    async fn calc_withdraw_one_coin(
        &self,
        gateway: Address,
        pool: Address,
        burn_amount: U256,
        i: i128,
    ) -> Result<U256, ChainError> {
        let contract = Depositer::new(gateway, self.client.clone());
        contract
            .calc_withdraw_one_coin(pool, burn_amount, i)
            .call()
            .await
            .map_err(describe)
    }

    async fn remove_liquidity_one_coin(
        &self,
        gateway: Address,
        pool: Address,
        burn_amount: U256,
        i: i128,
        min_amount: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        let contract = Depositer::new(gateway, self.client.clone());
        let call = contract
            .remove_liquidity_one_coin(pool, burn_amount, i, min_amount)
            .from(opts.from)
            .gas_price(opts.gas_price);
        let pending = call.send().await.map_err(describe)?;
        Ok(self.submitted(pending.tx_hash()))
    }
}

/// Flatten a contract error into the provider's message, decoding
/// `Error(string)` revert payloads when present.
fn describe<M: Middleware>(error: ContractError<M>) -> ChainError {
    if let ContractError::Revert(bytes) = &error {
        return ChainError::Provider(revert_reason(bytes));
    }
    ChainError::Provider(error.to_string())
}

fn revert_reason(bytes: &[u8]) -> String {
    // Skip selector (4 bytes), offset (32 bytes) and length (32 bytes)
    if bytes.len() > 68 {
        if let Ok(s) = String::from_utf8(bytes[68..].to_vec()) {
            return format!("execution reverted: {}", s.trim_matches('\0'));
        }
    }
    format!("execution reverted: 0x{}", hex::encode(bytes))
}
