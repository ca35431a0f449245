//! Client for Curve-style metapools: pool discovery, decimal scaling,
//! allowance management and approve/quote/submit sequencing, with results
//! published on a typed event bus.

pub mod allowance;
pub mod chain;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gas;
pub mod monitor;
pub mod orchestrator;
pub mod rpc;
pub mod store;
pub mod types;
pub mod units;

pub use dispatcher::{Action, ActionSender, Dispatcher};
pub use error::ClientError;
pub use events::{EventBus, StoreEvent};
pub use orchestrator::Orchestrator;
pub use store::Store;
