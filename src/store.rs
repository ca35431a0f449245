//! Process-wide client state.
//!
//! Session and pool collection are both swapped as whole values, so a reader
//! holding a snapshot never sees a half-applied refresh.

use ethers::types::Address;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::chain::ChainClient;
use crate::events::{EventBus, StoreEvent};
use crate::types::{Account, Pool};

/// A connected wallet: the account plus the provider that signs for it.
pub struct Session {
    pub account: Account,
    pub client: Arc<dyn ChainClient>,
}

pub struct Store {
    session: RwLock<Option<Arc<Session>>>,
    pools: RwLock<Arc<Vec<Pool>>>,
    events: EventBus,
}

impl Store {
    pub fn new(events: EventBus) -> Self {
        Self {
            session: RwLock::new(None),
            pools: RwLock::new(Arc::new(Vec::new())),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn connect(&self, account: Account, client: Arc<dyn ChainClient>) {
        info!("Wallet connected: {:?}", account.address);
        *self.session.write() = Some(Arc::new(Session { account, client }));
        self.events.emit(StoreEvent::StoreUpdated);
    }

    /// Drop the session and the per-account pool snapshot.
    pub fn disconnect(&self) {
        let previous = self.session.write().take();
        if let Some(session) = previous {
            info!("Wallet disconnected: {:?}", session.account.address);
            *self.pools.write() = Arc::new(Vec::new());
            self.events.emit(StoreEvent::StoreUpdated);
        }
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    pub fn account(&self) -> Option<Account> {
        self.session.read().as_ref().map(|s| s.account)
    }

    pub fn pools(&self) -> Arc<Vec<Pool>> {
        self.pools.read().clone()
    }

    pub fn pool(&self, address: Address) -> Option<Pool> {
        self.pools().iter().find(|p| p.address == address).cloned()
    }

    pub fn set_pools(&self, pools: Vec<Pool>) {
        *self.pools.write() = Arc::new(pools);
        self.events.emit(StoreEvent::StoreUpdated);
    }
}
