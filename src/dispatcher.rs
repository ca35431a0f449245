//! Action dispatcher
//!
//! Presentation code sends [`Action`]s down a channel; the dispatcher runs
//! each one as its own task against the shared orchestrator. Results come
//! back only through the store's event bus.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::orchestrator::Orchestrator;
use crate::types::{Asset, Intent, Pool};

/// Requests accepted from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Build the pool directory for the connected account
    Configure,
    /// Refresh cached balances
    GetBalances,
    /// Quote a swap without submitting anything
    GetSwapAmount {
        pool: Pool,
        from: Asset,
        to: Asset,
        amount: String,
    },
    /// Run a value-moving intent to completion
    Transact(Intent),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Configure => "configure",
            Action::GetBalances => "get-balances",
            Action::GetSwapAmount { .. } => "get-swap-amount",
            Action::Transact(_) => "transact",
        }
    }
}

pub type ActionSender = mpsc::UnboundedSender<Action>;

pub struct Dispatcher {
    orchestrator: Arc<Orchestrator>,
    rx: mpsc::UnboundedReceiver<Action>,
}

impl Dispatcher {
    /// Create a dispatcher and the sender that feeds it.
    pub fn new(orchestrator: Arc<Orchestrator>) -> (ActionSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { orchestrator, rx })
    }

    /// Run until every sender is dropped, then wait for in-flight actions.
    pub async fn run(mut self) {
        let mut tasks = JoinSet::new();
        info!("Dispatcher started");

        loop {
            tokio::select! {
                action = self.rx.recv() => {
                    let Some(action) = action else { break };
                    debug!("Dispatching {}", action.name());
                    let orchestrator = self.orchestrator.clone();
                    tasks.spawn(async move { dispatch(&orchestrator, action).await });
                }

                Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = done {
                        error!("Action task failed: {}", e);
                    }
                }
            }
        }

        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                error!("Action task failed: {}", e);
            }
        }
        info!("Dispatcher stopped");
    }
}

/// Route one action to the orchestrator. Failures were already published on
/// the event bus by the orchestrator.
pub async fn dispatch(orchestrator: &Orchestrator, action: Action) {
    let name = action.name();
    let result = match action {
        Action::Configure => orchestrator.configure().await,
        Action::GetBalances => orchestrator.get_balances().await,
        Action::GetSwapAmount {
            pool,
            from,
            to,
            amount,
        } => orchestrator
            .quote_swap(&pool, &from, &to, &amount)
            .await
            .map(|_| ()),
        Action::Transact(intent) => orchestrator.execute(intent).await.map(|_| ()),
    };

    if let Err(e) = result {
        debug!("{} ended early: {}", name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockChain, MockToken};
    use crate::chain::ChainClient;
    use crate::config::{GasSettings, ParsedContracts};
    use crate::directory::PoolDirectory;
    use crate::events::{EventBus, StoreEvent};
    use crate::gas::GasPriceResolver;
    use crate::orchestrator::DEFAULT_SLIPPAGE_BPS;
    use crate::store::Store;
    use crate::types::Account;
    use ethers::types::{Address, U256};
    use std::time::Duration;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn chain() -> MockChain {
        MockChain::new()
            .with_token(addr(0x100), MockToken::new("gusd3CRV", 18, U256::zero()))
            .with_token(addr(0x101), MockToken::new("GUSD", 2, U256::zero()))
            .with_token(addr(0x3c), MockToken::new("3Crv", 18, U256::zero()))
            .with_pool(addr(0x100), vec![addr(0x101), addr(0x3c)])
    }

    fn orchestrator(connected: bool) -> Arc<Orchestrator> {
        orchestrator_on(chain(), connected)
    }

    fn orchestrator_on(chain: MockChain, connected: bool) -> Arc<Orchestrator> {
        let store = Arc::new(Store::new(EventBus::default()));
        if connected {
            store.connect(Account::new(addr(0xacc)), Arc::new(chain) as Arc<dyn ChainClient>);
        }
        let contracts = ParsedContracts {
            factory: addr(0xfac),
            usd_depositer: addr(0xd0),
            btc_depositer: addr(0xd1),
            usd_base_lp: addr(0x3c),
        };
        let gas = GasPriceResolver::new(&GasSettings {
            oracle_url: "http://127.0.0.1:9/".into(),
            timeout: Duration::from_millis(100),
            default_gwei: "30".into(),
        }).unwrap();

        Arc::new(Orchestrator::new(
            store,
            Arc::new(PoolDirectory::new(&contracts)),
            Arc::new(gas),
            DEFAULT_SLIPPAGE_BPS,
        ))
    }

    async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>) -> StoreEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event within 5s")
                .unwrap();
            if event != StoreEvent::StoreUpdated {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_actions_reach_the_orchestrator() {
        let orchestrator = orchestrator(true);
        let mut events = orchestrator.store().events().subscribe();
        let (tx, dispatcher) = Dispatcher::new(orchestrator.clone());
        let running = tokio::spawn(dispatcher.run());

        tx.send(Action::Configure).unwrap();
        assert_eq!(next_event(&mut events).await, StoreEvent::ConfigureReturned);

        tx.send(Action::GetBalances).unwrap();
        assert_eq!(next_event(&mut events).await, StoreEvent::BalancesReturned);

        let pool = orchestrator.store().pools()[0].clone();
        tx.send(Action::GetSwapAmount {
            from: pool.assets[0].clone(),
            to: pool.assets[1].clone(),
            pool,
            amount: "1".into(),
        })
        .unwrap();
        assert!(matches!(
            next_event(&mut events).await,
            StoreEvent::SwapAmountReturned(_)
        ));

        drop(tx);
        running.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_drains_in_flight_actions() {
        let orchestrator = orchestrator(true);
        let mut events = orchestrator.store().events().subscribe();
        let (tx, dispatcher) = Dispatcher::new(orchestrator.clone());

        tx.send(Action::Configure).unwrap();
        tx.send(Action::GetBalances).unwrap();
        drop(tx);
        dispatcher.run().await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            if event != StoreEvent::StoreUpdated {
                seen.push(event);
            }
        }
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&StoreEvent::ConfigureReturned));
        assert!(seen.contains(&StoreEvent::BalancesReturned));
    }

    #[tokio::test]
    async fn test_closing_senders_lets_pending_intent_finish() {
        let mut chain = chain();
        chain.confirmation_delay = Some(Duration::from_millis(200));
        let orchestrator = orchestrator_on(chain, true);
        orchestrator.configure().await.unwrap();
        let pool = orchestrator.store().pools()[0].clone();

        let mut events = orchestrator.store().events().subscribe();
        let (tx, dispatcher) = Dispatcher::new(orchestrator.clone());
        let ticker = tx.clone();
        let running = tokio::spawn(dispatcher.run());

        tx.send(Action::Transact(Intent::Withdraw {
            pool,
            amount: "1".into(),
        }))
        .unwrap();
        // Wait until the withdrawal is pending, then close both senders
        loop {
            if let StoreEvent::TransactionHash(_) = next_event(&mut events).await {
                break;
            }
        }
        drop(ticker);
        drop(tx);
        running.await.unwrap();

        let mut completed = false;
        while let Ok(event) = events.try_recv() {
            completed |= matches!(event, StoreEvent::WithdrawReturned { .. });
        }
        assert!(completed);
    }

    #[tokio::test]
    async fn test_disconnected_actions_are_silent() {
        let orchestrator = orchestrator(false);
        let mut events = orchestrator.store().events().subscribe();

        dispatch(&orchestrator, Action::Configure).await;
        dispatch(&orchestrator, Action::GetBalances).await;

        assert!(events.try_recv().is_err());
    }
}
