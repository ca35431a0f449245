use ethers::types::U256;
use ethers::utils::parse_units;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::GasSettings;

#[derive(Debug, Deserialize)]
struct OracleResponse {
    fast: f64,
}

/// Gas price lookup against an external oracle. One bounded attempt per call;
/// every failure resolves to the configured default instead of an error.
pub struct GasPriceResolver {
    http_client: reqwest::Client,
    oracle_url: String,
    default_gwei: String,
}

impl GasPriceResolver {
    /// Fails only if the HTTP client cannot be built, in which case no
    /// timeout could be enforced either.
    pub fn new(settings: &GasSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http_client,
            oracle_url: settings.oracle_url.clone(),
            default_gwei: settings.default_gwei.clone(),
        })
    }

    /// Recommended gas price in whole gwei, as a numeric string.
    pub async fn resolve_gwei(&self) -> String {
        match self.fetch_fast().await {
            Ok(gwei) => {
                debug!("Gas oracle: fast = {} gwei", gwei);
                gwei
            }
            Err(e) => {
                warn!("Gas oracle unavailable ({}), using default {} gwei", e, self.default_gwei);
                self.default_gwei.clone()
            }
        }
    }

    /// Recommended gas price in wei, ready for a transaction.
    pub async fn resolve_wei(&self) -> U256 {
        let gwei = self.resolve_gwei().await;
        match parse_units(gwei.as_str(), "gwei") {
            Ok(wei) => wei.into(),
            Err(_) => match parse_units(self.default_gwei.as_str(), "gwei") {
                Ok(wei) => wei.into(),
                Err(e) => {
                    error!("Default gas price {:?} is not numeric: {}", self.default_gwei, e);
                    U256::zero()
                }
            },
        }
    }

    async fn fetch_fast(&self) -> eyre::Result<String> {
        let response = self.http_client.get(&self.oracle_url).send().await?;
        let body = response.text().await?;
        let parsed: OracleResponse = serde_json::from_str(&body)?;

        if !parsed.fast.is_finite() || parsed.fast < 0.0 {
            eyre::bail!("oracle returned unusable price {}", parsed.fast);
        }

        Ok(format!("{}", parsed.fast.round() as u64))
    }
}
