pub mod client;

pub use client::{connect, signed_client, verify_chain_id, SignedClient, WsClient};
