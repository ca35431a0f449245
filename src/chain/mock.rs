//! In-memory [`ChainClient`] for tests: scripted reads, recorded sends.

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::{Address, TxHash, U256};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{ChainClient, ChainError, Confirmations, Submission, TxOptions, GATEWAY_COINS};

#[derive(Debug, Clone)]
pub struct MockToken {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub balance: U256,
}

impl MockToken {
    pub fn new(symbol: &str, decimals: u8, balance: U256) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: format!("{} Token", symbol),
            decimals,
            balance,
        }
    }
}

/// Every send and the reads tests care about, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    PoolList(U256),
    Symbol(Address),
    Allowance { token: Address, spender: Address },
    Approve { token: Address, spender: Address, amount: U256, gas_price: U256 },
    GetDy { i: i128, j: i128, dx: U256 },
    Exchange { i: i128, j: i128, dx: U256, min_dy: U256 },
    CalcTokenAmount { amounts: [U256; GATEWAY_COINS] },
    AddLiquidity { gateway: Address, amounts: [U256; GATEWAY_COINS], min_mint: U256 },
    RemoveLiquidity { gateway: Address, burn: U256, min_amounts: [U256; GATEWAY_COINS] },
    CalcWithdrawOneCoin { burn: U256, i: i128 },
    RemoveLiquidityOneCoin { burn: U256, i: i128, min_amount: U256 },
}

#[derive(Default)]
pub struct MockChain {
    pub pools: Vec<Address>,
    pub coins: HashMap<Address, Vec<Address>>,
    pub tokens: HashMap<Address, MockToken>,
    pub allowances: DashMap<(Address, Address, Address), U256>,
    /// Delay applied to `pool_list(i)`, to scramble completion order
    pub pool_list_delays: HashMap<u64, Duration>,
    /// Tokens whose metadata reads fail
    pub broken_tokens: HashSet<Address>,
    pub fail_pool_count: Option<String>,
    pub fail_approve: Option<String>,
    pub fail_send: Option<String>,
    pub fail_quote: Option<String>,
    pub quote: U256,
    /// Confirmation script handed to every non-approval send
    pub confirmations: Vec<Result<u64, ChainError>>,
    /// Confirmation script handed to every approval
    pub approve_confirmations: Vec<Result<u64, ChainError>>,
    /// Time before an approval's first confirmation arrives
    pub approve_confirmation_delay: Option<Duration>,
    /// Time before a send's first confirmation arrives
    pub confirmation_delay: Option<Duration>,
    pub calls: Mutex<Vec<MockCall>>,
    sends: Mutex<u64>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            quote: U256::from(1000u64),
            confirmations: vec![Ok(1)],
            approve_confirmations: vec![Ok(1)],
            ..Default::default()
        }
    }

    pub fn with_token(mut self, address: Address, token: MockToken) -> Self {
        self.tokens.insert(address, token);
        self
    }

    pub fn with_pool(mut self, pool: Address, coins: Vec<Address>) -> Self {
        self.pools.push(pool);
        self.coins.insert(pool, coins);
        self
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((token, owner, spender), amount);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn approvals(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::Approve { .. }))
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    fn token(&self, token: Address) -> Result<&MockToken, ChainError> {
        if self.broken_tokens.contains(&token) {
            return Err(ChainError::Provider(format!("call to {:?} failed", token)));
        }
        self.tokens
            .get(&token)
            .ok_or_else(|| ChainError::Provider(format!("no contract at {:?}", token)))
    }

    fn next_hash(&self) -> TxHash {
        let mut sends = self.sends.lock();
        *sends += 1;
        TxHash::from_low_u64_be(*sends)
    }

    fn send(&self, call: MockCall) -> Result<Submission, ChainError> {
        if let Some(message) = &self.fail_send {
            return Err(ChainError::Provider(message.clone()));
        }
        self.record(call);
        Ok(Submission {
            hash: self.next_hash(),
            confirmations: delayed(self.confirmations.clone(), self.confirmation_delay),
        })
    }

    fn quoted(&self) -> Result<U256, ChainError> {
        match &self.fail_quote {
            Some(message) => Err(ChainError::Provider(message.clone())),
            None => Ok(self.quote),
        }
    }
}

fn delayed(script: Vec<Result<u64, ChainError>>, delay: Option<Duration>) -> Confirmations {
    let delay = delay.unwrap_or_default();
    futures::stream::once(async move {
        tokio::time::sleep(delay).await;
        futures::stream::iter(script)
    })
    .flatten()
    .boxed()
}

#[async_trait]
impl ChainClient for MockChain {
    async fn pool_count(&self, _factory: Address) -> Result<U256, ChainError> {
        if let Some(message) = &self.fail_pool_count {
            return Err(ChainError::Provider(message.clone()));
        }
        Ok(U256::from(self.pools.len()))
    }

    async fn pool_list(&self, _factory: Address, index: U256) -> Result<Address, ChainError> {
        if let Some(delay) = self.pool_list_delays.get(&index.as_u64()) {
            tokio::time::sleep(*delay).await;
        }
        self.record(MockCall::PoolList(index));
        self.pools
            .get(index.as_usize())
            .copied()
            .ok_or_else(|| ChainError::Provider("index out of range".into()))
    }

    async fn get_coins(&self, _factory: Address, pool: Address) -> Result<Vec<Address>, ChainError> {
        self.coins
            .get(&pool)
            .cloned()
            .ok_or_else(|| ChainError::Provider(format!("unknown pool {:?}", pool)))
    }

    async fn symbol(&self, token: Address) -> Result<String, ChainError> {
        self.record(MockCall::Symbol(token));
        Ok(self.token(token)?.symbol.clone())
    }

    async fn name(&self, token: Address) -> Result<String, ChainError> {
        Ok(self.token(token)?.name.clone())
    }

    async fn decimals(&self, token: Address) -> Result<u8, ChainError> {
        Ok(self.token(token)?.decimals)
    }

    async fn balance_of(&self, token: Address, _owner: Address) -> Result<U256, ChainError> {
        Ok(self.token(token)?.balance)
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        self.record(MockCall::Allowance { token, spender });
        self.token(token)?;
        Ok(self
            .allowances
            .get(&(token, owner, spender))
            .map(|a| *a)
            .unwrap_or_default())
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        if let Some(message) = &self.fail_approve {
            return Err(ChainError::Provider(message.clone()));
        }
        self.record(MockCall::Approve {
            token,
            spender,
            amount,
            gas_price: opts.gas_price,
        });
        // A reverted approval leaves the allowance untouched
        if matches!(self.approve_confirmations.first(), Some(Ok(_))) {
            self.allowances.insert((token, opts.from, spender), amount);
        }

        Ok(Submission {
            hash: self.next_hash(),
            confirmations: delayed(
                self.approve_confirmations.clone(),
                self.approve_confirmation_delay,
            ),
        })
    }

    async fn get_dy(&self, _pool: Address, i: i128, j: i128, dx: U256) -> Result<U256, ChainError> {
        self.record(MockCall::GetDy { i, j, dx });
        self.quoted()
    }

    async fn exchange(
        &self,
        _pool: Address,
        i: i128,
        j: i128,
        dx: U256,
        min_dy: U256,
        _opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        self.send(MockCall::Exchange { i, j, dx, min_dy })
    }

    async fn calc_token_amount(
        &self,
        _gateway: Address,
        _pool: Address,
        amounts: [U256; GATEWAY_COINS],
        _is_deposit: bool,
    ) -> Result<U256, ChainError> {
        self.record(MockCall::CalcTokenAmount { amounts });
        self.quoted()
    }

    async fn add_liquidity(
        &self,
        gateway: Address,
        _pool: Address,
        amounts: [U256; GATEWAY_COINS],
        min_mint_amount: U256,
        _opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        self.send(MockCall::AddLiquidity {
            gateway,
            amounts,
            min_mint: min_mint_amount,
        })
    }

    async fn remove_liquidity(
        &self,
        gateway: Address,
        _pool: Address,
        burn_amount: U256,
        min_amounts: [U256; GATEWAY_COINS],
        _opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        self.send(MockCall::RemoveLiquidity {
            gateway,
            burn: burn_amount,
            min_amounts,
        })
    }

    async fn calc_withdraw_one_coin(
        &self,
        _gateway: Address,
        _pool: Address,
        burn_amount: U256,
        i: i128,
    ) -> Result<U256, ChainError> {
        self.record(MockCall::CalcWithdrawOneCoin { burn: burn_amount, i });
        self.quoted()
    }

    async fn remove_liquidity_one_coin(
        &self,
        _gateway: Address,
        _pool: Address,
        burn_amount: U256,
        i: i128,
        min_amount: U256,
        _opts: TxOptions,
    ) -> Result<Submission, ChainError> {
        self.send(MockCall::RemoveLiquidityOneCoin {
            burn: burn_amount,
            i,
            min_amount,
        })
    }
}
