//! Pool directory: enumerate factory pools and assemble per-pool records.

use ethers::types::{Address, U256};
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::chain::ChainClient;
use crate::config::ParsedContracts;
use crate::error::ClientError;
use crate::types::{Account, Asset, GatewayKind, LiquidityGateway, Pool};
use crate::units::to_decimal;

pub struct PoolDirectory {
    factory: Address,
    usd_gateway: Address,
    btc_gateway: Address,
    usd_base_lp: Address,
}

impl PoolDirectory {
    pub fn new(contracts: &ParsedContracts) -> Self {
        Self {
            factory: contracts.factory,
            usd_gateway: contracts.usd_depositer,
            btc_gateway: contracts.btc_depositer,
            usd_base_lp: contracts.usd_base_lp,
        }
    }

    /// Pool addresses in factory index order. Index reads run concurrently.
    pub async fn list_pools(&self, client: &dyn ChainClient) -> Result<Vec<Address>, ClientError> {
        let count = client.pool_count(self.factory).await?;
        if count > U256::from(u32::MAX) {
            return Err(ClientError::NetworkRead(format!("implausible pool_count {}", count)));
        }

        let reads = (0..count.as_u64()).map(|i| client.pool_list(self.factory, U256::from(i)));
        let pools = try_join_all(reads).await?;

        debug!("Factory lists {} pools", pools.len());
        Ok(pools)
    }

    /// Read the LP token and every coin of `address`. Any failed read fails
    /// the whole record.
    pub async fn build_pool_record(
        &self,
        client: &dyn ChainClient,
        address: Address,
        account: &Account,
    ) -> Result<Pool, ClientError> {
        let (symbol, decimals, name, balance) = futures::try_join!(
            client.symbol(address),
            client.decimals(address),
            client.name(address),
            client.balance_of(address, account.address),
        )?;

        let coins = client.get_coins(self.factory, address).await?;
        let assets = try_join_all(
            coins
                .iter()
                .enumerate()
                .map(|(index, coin)| self.build_asset(client, index, *coin, account)),
        )
        .await?;

        let liquidity = self.select_gateway(&assets);

        Ok(Pool {
            address,
            id: symbol.clone(),
            symbol,
            name,
            decimals,
            balance: to_decimal(balance, decimals)?,
            assets,
            liquidity,
        })
    }

    /// Full rebuild: every pool concurrently, returned in factory index order.
    pub async fn refresh(&self, client: &dyn ChainClient, account: &Account) -> Result<Vec<Pool>, ClientError> {
        let addresses = self.list_pools(client).await?;
        let pools = try_join_all(
            addresses
                .iter()
                .map(|address| self.build_pool_record(client, *address, account)),
        )
        .await?;

        info!("Pool directory refreshed: {} pools", pools.len());
        Ok(pools)
    }

    async fn build_asset(
        &self,
        client: &dyn ChainClient,
        index: usize,
        coin: Address,
        account: &Account,
    ) -> Result<Asset, ClientError> {
        let (symbol, decimals, name, balance) = futures::try_join!(
            client.symbol(coin),
            client.decimals(coin),
            client.name(coin),
            client.balance_of(coin, account.address),
        )?;

        Ok(Asset {
            index,
            id: symbol.clone(),
            name,
            symbol,
            address: coin,
            decimals,
            balance: to_decimal(balance, decimals)?,
        })
    }

    /// Pools paired with the USD base pool carry its LP token as second coin.
    fn select_gateway(&self, assets: &[Asset]) -> LiquidityGateway {
        let usd = assets
            .get(1)
            .map(|a| a.address == self.usd_base_lp)
            .unwrap_or(false);

        if usd {
            LiquidityGateway {
                address: self.usd_gateway,
                kind: GatewayKind::Usd,
            }
        } else {
            LiquidityGateway {
                address: self.btc_gateway,
                kind: GatewayKind::Btc,
            }
        }
    }
}
