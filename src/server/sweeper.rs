use crate::domain_port::ResetTokenRepo;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Periodically drops expired reset tokens. The issue path already purges
/// per-email; this catches rows for addresses nobody asks about again.
pub struct Sweeper {
    reset_repo: Arc<dyn ResetTokenRepo>,
    cancellation_token: CancellationToken,
    interval: Duration,
}

impl Sweeper {
    pub fn new(
        reset_repo: Arc<dyn ResetTokenRepo>,
        cancellation_token: CancellationToken,
        interval: Duration,
    ) -> Self {
        Self {
            reset_repo,
            cancellation_token,
            interval,
        }
    }

    async fn tick_once(&self) -> anyhow::Result<()> {
        let purged = self
            .reset_repo
            .delete_expired(Utc::now())
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        if purged > 0 {
            info!("purged {} expired reset tokens", purged);
        }

        tokio::time::sleep(self.interval).await;
        Ok(())
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("sweeper shutting down...");
                    break;
                }
                result = self.tick_once() => {
                    if let Err(e) = result {
                        tracing::error!("sweeper error: {:#?}", e);
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }
        Ok(())
    }
}
