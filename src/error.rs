use ethers::types::Address;
use thiserror::Error;

use crate::chain::ChainError;
use crate::units::UnitsError;

/// Failure taxonomy for client flows. Provider messages are carried verbatim
/// so the user-facing notification shows what the wallet or node said.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No wallet connected; flows return early without emitting anything
    #[error("no connected account")]
    NotConnected,
    /// A contract read failed
    #[error("{0}")]
    NetworkRead(String),
    /// Allowance increase was rejected or failed
    #[error("{0}")]
    Approval(String),
    /// Wallet rejected or failed to broadcast, or the transaction failed after submission
    #[error("{0}")]
    Submission(String),
    #[error("invalid amount: {0}")]
    Amount(#[from] UnitsError),
    #[error("pool {pool:?} has no asset at index {index}")]
    MissingAsset { pool: Address, index: usize },
}

impl ClientError {
    /// Whether this failure is reported on the event bus.
    pub fn is_reported(&self) -> bool {
        !matches!(self, ClientError::NotConnected)
    }
}

/// Reads default to the network-read class; approval and submission paths
/// map their provider errors explicitly.
impl From<ChainError> for ClientError {
    fn from(e: ChainError) -> Self {
        ClientError::NetworkRead(e.to_string())
    }
}
