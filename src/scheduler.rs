//! Periodic scheduler: runs a full sync immediately, then on a fixed
//! interval until Ctrl-C.

use std::time::Duration;
use tracing::{error, info};

use crate::error::Result;
use crate::sync::SyncEngine;

pub struct Scheduler {
    engine: SyncEngine,
    interval: Duration,
}

impl Scheduler {
    pub fn new(engine: SyncEngine, update_interval_hours: u64) -> Self {
        Self {
            engine,
            interval: Duration::from_secs(update_interval_hours * 3600),
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!(
            "Scheduler started; full sync every {:?}. Press Ctrl+C to stop.",
            self.interval
        );

        // A Ctrl-C during a sync aborts it at the next record boundary.
        let cancel = self.engine.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested; stopping at the next record boundary");
                cancel.cancel();
            }
        });

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.engine.cancel_token().is_cancelled() {
                        break;
                    }
                    info!("Starting scheduled full sync");
                    let outcome = self.engine.fetch_all(None).await;
                    println!("{}", outcome.summary());
                    if self.engine.cancel_token().is_cancelled() {
                        break;
                    }
                }
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to listen for shutdown signal: {e}");
                    }
                    break;
                }
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }
}
