use ethers::types::TxHash;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::types::SwapQuote;

/// Notifications published to presentation-layer consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Shared state was replaced
    StoreUpdated,
    /// Pool directory rebuilt
    ConfigureReturned,
    BalancesReturned,
    /// Deposit confirmed
    DepositReturned { hash: TxHash },
    /// Withdrawal (proportional or single-coin) confirmed
    WithdrawReturned { hash: TxHash },
    SwapReturned { hash: TxHash },
    SwapAmountReturned(SwapQuote),
    /// Provider accepted a transaction
    TransactionHash(TxHash),
    /// Logging/telemetry channel for failures
    Error(String),
    /// Same failure, meant for the user
    ErrorNotification(String),
}

/// Typed fan-out channel. Every subscriber sees every event emitted after it
/// subscribed; slow subscribers may observe `Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: StoreEvent) {
        if self.tx.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    /// Publish a failure on both the generic and the user-facing channel.
    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.emit(StoreEvent::Error(message.clone()));
        self.emit(StoreEvent::ErrorNotification(message));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
