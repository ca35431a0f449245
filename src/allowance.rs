use ethers::types::{Address, U256};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chain::{ChainClient, TxOptions};
use crate::error::ClientError;
use crate::gas::GasPriceResolver;
use crate::types::Asset;
use crate::units::{to_base_units, to_decimal};

/// Makes sure a spender may move the requested amount of an asset before a
/// value-moving call. Raises the allowance to `U256::MAX` once instead of
/// approving per operation.
pub struct AllowanceGuarantor {
    gas: Arc<GasPriceResolver>,
}

impl AllowanceGuarantor {
    pub fn new(gas: Arc<GasPriceResolver>) -> Self {
        Self { gas }
    }

    /// Returns `true` when an approval had to be submitted.
    pub async fn ensure_allowance(
        &self,
        client: &dyn ChainClient,
        asset: &Asset,
        owner: Address,
        amount: &str,
        spender: Address,
    ) -> Result<bool, ClientError> {
        let requested = to_base_units(amount, asset.decimals)?;

        let allowance = client
            .allowance(asset.address, owner, spender)
            .await
            .map_err(|e| ClientError::Approval(e.to_string()))?;

        if allowance >= requested {
            debug!(
                "{} allowance for {:?} sufficient: {} >= {}",
                asset.symbol,
                spender,
                to_decimal(allowance, asset.decimals).unwrap_or_default(),
                amount
            );
            return Ok(false);
        }

        let gas_price = self.gas.resolve_wei().await;
        info!("Approving {} for {:?}", asset.symbol, spender);

        let submission = client
            .approve(
                asset.address,
                spender,
                U256::MAX,
                TxOptions {
                    from: owner,
                    gas_price,
                },
            )
            .await
            .map_err(|e| ClientError::Approval(e.to_string()))?;

        info!("Approval submitted: {:?}", submission.hash);

        // The dependent call is estimated against chain state, so the
        // approval has to be mined first.
        let mut confirmations = submission.confirmations;
        match confirmations.next().await {
            Some(Ok(count)) => {
                debug!("Approval {:?} confirmation {}", submission.hash, count);
                Ok(true)
            }
            Some(Err(e)) => Err(ClientError::Approval(e.to_string())),
            None => Err(ClientError::Approval(format!(
                "approval {:?} was not confirmed",
                submission.hash
            ))),
        }
    }
}
