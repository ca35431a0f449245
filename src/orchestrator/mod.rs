//! Transaction orchestration.
//!
//! Each intent runs as one linear async sequence:
//! approve -> quote -> submit -> wait for the first confirmation -> refresh.
//! Every failure after the connection check is published on the event bus
//! twice (generic and user-facing) before it is returned.

use ethers::types::{Address, TxHash, U256};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::allowance::AllowanceGuarantor;
use crate::chain::{Submission, TxOptions, GATEWAY_COINS};
use crate::directory::PoolDirectory;
use crate::error::ClientError;
use crate::events::StoreEvent;
use crate::gas::GasPriceResolver;
use crate::store::{Session, Store};
use crate::types::{Asset, Intent, IntentKind, Pool, SwapQuote};
use crate::units::{display_ratio, to_base_units, to_decimal};

pub mod slippage;


pub use slippage::{min_out, DEFAULT_SLIPPAGE_BPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStage {
    Approving,
    Quoting,
    Submitting,
    Pending,
    Confirmed,
    Failed,
}

impl std::fmt::Display for IntentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentStage::Approving => write!(f, "approving"),
            IntentStage::Quoting => write!(f, "quoting"),
            IntentStage::Submitting => write!(f, "submitting"),
            IntentStage::Pending => write!(f, "pending"),
            IntentStage::Confirmed => write!(f, "confirmed"),
            IntentStage::Failed => write!(f, "failed"),
        }
    }
}

pub struct Orchestrator {
    store: Arc<Store>,
    directory: Arc<PoolDirectory>,
    allowance: AllowanceGuarantor,
    gas: Arc<GasPriceResolver>,
    slippage_bps: u64,
}

impl Orchestrator {
    pub fn new(
        store: Arc<Store>,
        directory: Arc<PoolDirectory>,
        gas: Arc<GasPriceResolver>,
        slippage_bps: u64,
    ) -> Self {
        Self {
            store,
            directory,
            allowance: AllowanceGuarantor::new(gas.clone()),
            gas,
            slippage_bps,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Rebuild the pool directory for the connected account.
    pub async fn configure(&self) -> Result<(), ClientError> {
        let session = self.store.session().ok_or(ClientError::NotConnected)?;
        let result = self.publish_directory(&session, StoreEvent::ConfigureReturned).await;
        self.reported(result)
    }

    /// Refresh balances. Balances live on the pool records, so this is a
    /// directory rebuild announced as a balance update.
    pub async fn get_balances(&self) -> Result<(), ClientError> {
        let session = self.store.session().ok_or(ClientError::NotConnected)?;
        let result = self.publish_directory(&session, StoreEvent::BalancesReturned).await;
        self.reported(result)
    }

    /// Quote `amount` of `from` into `to` on `pool` and publish it.
    pub async fn quote_swap(
        &self,
        pool: &Pool,
        from: &Asset,
        to: &Asset,
        amount: &str,
    ) -> Result<SwapQuote, ClientError> {
        let session = self.store.session().ok_or(ClientError::NotConnected)?;
        let result = self.swap_quote(&session, pool, from, to, amount).await;
        let quote = self.reported(result)?;

        self.store.events().emit(StoreEvent::SwapAmountReturned(quote.clone()));
        Ok(quote)
    }

    /// Run an intent to its terminal state. Returns the hash of the
    /// confirmed transaction.
    pub async fn execute(&self, intent: Intent) -> Result<TxHash, ClientError> {
        let session = self.store.session().ok_or(ClientError::NotConnected)?;
        let kind = intent.kind();
        info!("{} on {} requested", kind, intent.pool().symbol);

        let result = match self.submit(&session, intent).await {
            Ok(submission) => self.await_confirmation(&session, kind, submission).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!("{} {}: {}", kind, IntentStage::Failed, e);
        }
        self.reported(result)
    }

    async fn submit(&self, session: &Session, intent: Intent) -> Result<Submission, ClientError> {
        match intent {
            Intent::Deposit {
                pool,
                first_amount,
                second_amount,
            } => self.deposit(session, &pool, &first_amount, &second_amount).await,
            Intent::Withdraw { pool, amount } => self.withdraw(session, &pool, &amount).await,
            Intent::WithdrawOneCoin { pool, asset, amount } => {
                self.withdraw_one_coin(session, &pool, &asset, &amount).await
            }
            Intent::Swap {
                pool,
                from,
                to,
                amount,
            } => self.swap(session, &pool, &from, &to, &amount).await,
        }
    }

    async fn deposit(
        &self,
        session: &Session,
        pool: &Pool,
        first_amount: &str,
        second_amount: &str,
    ) -> Result<Submission, ClientError> {
        let kind = IntentKind::Deposit;
        let first = pool_asset(pool, 0)?;
        let second = pool_asset(pool, 1)?;
        let gateway = pool.liquidity.address;

        let mut amounts = [U256::zero(); GATEWAY_COINS];
        amounts[0] = to_base_units(first_amount, first.decimals)?;
        amounts[1] = to_base_units(second_amount, second.decimals)?;

        self.advance(kind, IntentStage::Approving);
        let client = session.client.as_ref();
        let owner = session.account.address;
        self.allowance
            .ensure_allowance(client, first, owner, first_amount, gateway)
            .await?;
        self.allowance
            .ensure_allowance(client, second, owner, second_amount, gateway)
            .await?;

        self.advance(kind, IntentStage::Quoting);
        let quote = client
            .calc_token_amount(gateway, pool.address, amounts, true)
            .await?;
        let min_mint = min_out(quote, self.slippage_bps);
        debug!("Deposit quote {} LP, minimum {}", quote, min_mint);

        self.advance(kind, IntentStage::Submitting);
        let opts = self.tx_options(owner).await;
        client
            .add_liquidity(gateway, pool.address, amounts, min_mint, opts)
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))
    }

    /// Proportional withdrawal. Minimum amounts are all zero: nothing guards
    /// this call against price movement between signing and inclusion.
    async fn withdraw(&self, session: &Session, pool: &Pool, amount: &str) -> Result<Submission, ClientError> {
        let burn = to_base_units(amount, pool.decimals)?;
        let min_amounts = [U256::zero(); GATEWAY_COINS];

        self.advance(IntentKind::Withdraw, IntentStage::Submitting);
        let opts = self.tx_options(session.account.address).await;
        session
            .client
            .remove_liquidity(pool.liquidity.address, pool.address, burn, min_amounts, opts)
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))
    }

    async fn withdraw_one_coin(
        &self,
        session: &Session,
        pool: &Pool,
        asset: &Asset,
        amount: &str,
    ) -> Result<Submission, ClientError> {
        let kind = IntentKind::WithdrawOneCoin;
        let asset = pool_asset(pool, asset.index)?;
        let burn = to_base_units(amount, pool.decimals)?;
        let gateway = pool.liquidity.address;
        let client = session.client.as_ref();
        let i = asset.index as i128;

        self.advance(kind, IntentStage::Quoting);
        let quote = client.calc_withdraw_one_coin(gateway, pool.address, burn, i).await?;
        let min_amount = min_out(quote, self.slippage_bps);

        self.advance(kind, IntentStage::Submitting);
        let opts = self.tx_options(session.account.address).await;
        client
            .remove_liquidity_one_coin(gateway, pool.address, burn, i, min_amount, opts)
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))
    }

    async fn swap(
        &self,
        session: &Session,
        pool: &Pool,
        from: &Asset,
        to: &Asset,
        amount: &str,
    ) -> Result<Submission, ClientError> {
        let kind = IntentKind::Swap;
        let from = pool_asset(pool, from.index)?;
        let to = pool_asset(pool, to.index)?;
        let dx = to_base_units(amount, from.decimals)?;
        let client = session.client.as_ref();
        let owner = session.account.address;

        self.advance(kind, IntentStage::Approving);
        self.allowance
            .ensure_allowance(client, from, owner, amount, pool.address)
            .await?;

        self.advance(kind, IntentStage::Quoting);
        let (i, j) = (from.index as i128, to.index as i128);
        let dy = client.get_dy(pool.address, i, j, dx).await?;
        let min_dy = min_out(dy, self.slippage_bps);
        debug!("Swap quote {} {} -> {} {}, minimum {}", dx, from.symbol, dy, to.symbol, min_dy);

        self.advance(kind, IntentStage::Submitting);
        let opts = self.tx_options(owner).await;
        client
            .exchange(pool.address, i, j, dx, min_dy, opts)
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))
    }

    async fn swap_quote(
        &self,
        session: &Session,
        pool: &Pool,
        from: &Asset,
        to: &Asset,
        amount: &str,
    ) -> Result<SwapQuote, ClientError> {
        let from = pool_asset(pool, from.index)?;
        let to = pool_asset(pool, to.index)?;
        let dx = to_base_units(amount, from.decimals)?;

        let dy = session
            .client
            .get_dy(pool.address, from.index as i128, to.index as i128, dx)
            .await?;

        Ok(SwapQuote {
            send_amount: amount.to_string(),
            receive_amount: to_decimal(dy, to.decimals)?,
            receive_per_send: display_ratio(dy, to.decimals, dx, from.decimals),
            send_per_receive: display_ratio(dx, from.decimals, dy, to.decimals),
        })
    }

    /// Publish the hash, then wait for confirmation count 1, which triggers
    /// exactly one directory refresh. Other counts are ignored.
    async fn await_confirmation(
        &self,
        session: &Session,
        kind: IntentKind,
        submission: Submission,
    ) -> Result<TxHash, ClientError> {
        let hash = submission.hash;
        info!("{} submitted: {:?}", kind, hash);
        self.store.events().emit(StoreEvent::TransactionHash(hash));
        self.advance(kind, IntentStage::Pending);

        let mut confirmations = submission.confirmations;
        while let Some(next) = confirmations.next().await {
            match next {
                Ok(1) => {
                    self.advance(kind, IntentStage::Confirmed);
                    // A failed refresh is reported on its own; the transaction stays confirmed
                    let refreshed = self
                        .publish_directory(session, StoreEvent::ConfigureReturned)
                        .await;
                    let _ = self.reported(refreshed);
                    self.store.events().emit(completed(kind, hash));
                    return Ok(hash);
                }
                Ok(count) => debug!("{:?}: confirmation {}", hash, count),
                Err(e) => return Err(ClientError::Submission(e.to_string())),
            }
        }

        Err(ClientError::Submission(format!(
            "transaction {:?} was not confirmed",
            hash
        )))
    }

    /// Rebuild and publish the pool collection, unless the wallet changed
    /// while the reads were in flight.
    async fn publish_directory(&self, session: &Session, done: StoreEvent) -> Result<(), ClientError> {
        let pools = self
            .directory
            .refresh(session.client.as_ref(), &session.account)
            .await?;

        if self.store.account() != Some(session.account) {
            debug!("Account changed during refresh, discarding {} pools", pools.len());
            return Ok(());
        }

        self.store.set_pools(pools);
        self.store.events().emit(done);
        Ok(())
    }

    async fn tx_options(&self, from: Address) -> TxOptions {
        TxOptions {
            from,
            gas_price: self.gas.resolve_wei().await,
        }
    }

    fn advance(&self, kind: IntentKind, stage: IntentStage) {
        debug!("{} -> {}", kind, stage);
    }

    fn reported<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(e) = &result {
            if e.is_reported() {
                self.store.events().report(e.to_string());
            }
        }
        result
    }
}

fn pool_asset(pool: &Pool, index: usize) -> Result<&Asset, ClientError> {
    pool.asset(index).ok_or(ClientError::MissingAsset {
        pool: pool.address,
        index,
    })
}

fn completed(kind: IntentKind, hash: TxHash) -> StoreEvent {
    match kind {
        IntentKind::Deposit => StoreEvent::DepositReturned { hash },
        IntentKind::Withdraw | IntentKind::WithdrawOneCoin => StoreEvent::WithdrawReturned { hash },
        IntentKind::Swap => StoreEvent::SwapReturned { hash },
    }
}
