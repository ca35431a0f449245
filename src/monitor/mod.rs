use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::events::StoreEvent;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub txs_submitted: u64,
    pub deposits: u64,
    pub withdrawals: u64,
    pub swaps: u64,
    pub quotes: u64,
    pub refreshes: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    pub start_time: Option<Instant>,
}

impl Stats {
    pub fn txs_completed(&self) -> u64 {
        self.deposits + self.withdrawals + self.swaps
    }
}

/// Event-bus telemetry: counts what the client did and logs a summary.
pub struct Monitor {
    stats: RwLock<Stats>,
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            stats: RwLock::new(Stats {
                start_time: Some(Instant::now()),
                ..Default::default()
            }),
        }
    }

    pub async fn record(&self, event: &StoreEvent) {
        let mut stats = self.stats.write().await;

        match event {
            StoreEvent::TransactionHash(hash) => {
                stats.txs_submitted += 1;
                info!("📤 TX #{} submitted: {:?}", stats.txs_submitted, hash);
            }
            StoreEvent::DepositReturned { hash } => {
                stats.deposits += 1;
                info!("✅ Deposit confirmed: {:?}", hash);
            }
            StoreEvent::WithdrawReturned { hash } => {
                stats.withdrawals += 1;
                info!("✅ Withdrawal confirmed: {:?}", hash);
            }
            StoreEvent::SwapReturned { hash } => {
                stats.swaps += 1;
                info!("✅ Swap confirmed: {:?}", hash);
            }
            StoreEvent::SwapAmountReturned(_) => stats.quotes += 1,
            StoreEvent::ConfigureReturned | StoreEvent::BalancesReturned => stats.refreshes += 1,
            StoreEvent::Error(message) => {
                stats.errors += 1;
                stats.last_error = Some(message.clone());
            }
            // Mirrors `Error`
            StoreEvent::ErrorNotification(_) | StoreEvent::StoreUpdated => {}
        }
    }

    pub async fn get_stats(&self) -> Stats {
        self.stats.read().await.clone()
    }

    pub async fn log_summary(&self) {
        let stats = self.stats.read().await;

        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);
        let hours = uptime / 3600;
        let minutes = (uptime % 3600) / 60;

        let success_rate = if stats.txs_submitted > 0 {
            (stats.txs_completed() as f64 / stats.txs_submitted as f64) * 100.0
        } else {
            0.0
        };

        info!("═══════════════════════════════════════════");
        info!("📊 CLIENT STATISTICS");
        info!("═══════════════════════════════════════════");
        info!("Uptime:              {}h {}m", hours, minutes);
        info!("Directory Refreshes: {}", stats.refreshes);
        info!("Swap Quotes:         {}", stats.quotes);
        info!("TXs Submitted:       {}", stats.txs_submitted);
        info!("Deposits:            {}", stats.deposits);
        info!("Withdrawals:         {}", stats.withdrawals);
        info!("Swaps:               {}", stats.swaps);
        info!("Success Rate:        {:.1}%", success_rate);
        info!("Errors:              {}", stats.errors);
        if let Some(last) = &stats.last_error {
            info!("Last Error:          {}", last);
        }
        info!("═══════════════════════════════════════════");
    }

    /// Consume the bus until it closes, logging a summary every `every`.
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<StoreEvent>, every: Duration) {
        let mut summary = tokio::time::interval(every);
        // Don't fire immediately
        summary.tick().await;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => self.record(&event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Monitor lagged, {} events missed", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                _ = summary.tick() => self.log_summary().await,
            }
        }

        self.log_summary().await;
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}
