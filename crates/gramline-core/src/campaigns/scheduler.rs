//! Campaign Scheduler - polls for due campaigns and launches locked ticks
//!
//! Mutual exclusion per campaign rides on a TTL-bounded set-if-absent lock in
//! the ephemeral store: best-effort and time-boxed, so a crashed holder's
//! lock self-expires and the campaign is retried on a later tick.

use super::executor::CampaignExecutor;
use super::selector::campaign_is_due;
use anyhow::Result;
use chrono::Utc;
use gramline_storage::db::DatabasePool;
use gramline_storage::kv::KvStore;
use gramline_storage::repository::{CampaignRepository, MessageLogRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Ephemeral lock key guarding one campaign's processing tick
pub fn campaign_lock_key(campaign_id: Uuid) -> String {
    format!("lock:{}", campaign_id)
}

/// Polls campaigns and triggers locked processing ticks
pub struct CampaignScheduler {
    campaigns: CampaignRepository,
    logs: MessageLogRepository,
    kv: Arc<dyn KvStore>,
    executor: Arc<CampaignExecutor>,
    tick_secs: u64,
    lock_ttl_secs: u64,
    token: CancellationToken,
}

impl CampaignScheduler {
    /// Create a new scheduler
    pub fn new(
        db_pool: &DatabasePool,
        kv: Arc<dyn KvStore>,
        executor: Arc<CampaignExecutor>,
        token: CancellationToken,
    ) -> Self {
        let pool = db_pool.pool().clone();
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            logs: MessageLogRepository::new(pool),
            kv,
            executor,
            tick_secs: 30,
            lock_ttl_secs: 120,
            token,
        }
    }

    /// Override the polling period and lock TTL
    pub fn with_timing(mut self, tick_secs: u64, lock_ttl_secs: u64) -> Self {
        self.tick_secs = tick_secs;
        self.lock_ttl_secs = lock_ttl_secs;
        self
    }

    /// Run the polling loop until cancelled.
    ///
    /// A failed tick is logged and the loop carries on; nothing short of
    /// cancellation stops it.
    pub async fn run(&self) {
        let mut ticker = interval(Duration::from_secs(self.tick_secs));

        info!(tick_secs = self.tick_secs, "Campaign scheduler started");

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.tick().await {
                error!("Scheduler tick failed: {}", e);
            }
        }

        info!("Campaign scheduler stopped");
    }

    /// One polling pass: find due campaigns, lock, and spawn their ticks
    async fn tick(&self) -> Result<()> {
        let campaigns = self.campaigns.list_active().await?;
        let now = Utc::now();

        for campaign in campaigns {
            let last_sent = self.logs.last_sent_at(campaign.id).await?;
            if !campaign_is_due(&campaign, last_sent, now) {
                continue;
            }

            let lock_key = campaign_lock_key(campaign.id);
            let acquired = self
                .kv
                .set_nx(&lock_key, "1", Duration::from_secs(self.lock_ttl_secs))
                .await?;

            if !acquired {
                // Another tick is already in flight; not an error
                debug!(campaign = %campaign.id, "Tick already in flight");
                continue;
            }

            let executor = self.executor.clone();
            let kv = self.kv.clone();
            let campaign_id = campaign.id;

            tokio::spawn(async move {
                if let Err(e) = executor.run_once(campaign_id).await {
                    error!(campaign = %campaign_id, "Campaign tick failed: {}", e);
                }

                // Released regardless of the tick's outcome; the TTL covers a
                // crashed holder
                if let Err(e) = kv.del(&campaign_lock_key(campaign_id)).await {
                    warn!(campaign = %campaign_id, "Failed to release lock: {}", e);
                }
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramline_storage::kv::MemoryKv;

    #[tokio::test]
    async fn concurrent_lock_attempts_yield_one_winner() {
        let kv = Arc::new(MemoryKv::new());
        let campaign_id = Uuid::new_v4();
        let key = campaign_lock_key(campaign_id);
        let ttl = Duration::from_secs(120);

        let (a, b) = tokio::join!(kv.set_nx(&key, "1", ttl), kv.set_nx(&key, "1", ttl));

        let wins = [a.unwrap(), b.unwrap()];
        assert_eq!(wins.iter().filter(|w| **w).count(), 1);
    }

    #[tokio::test]
    async fn released_lock_can_be_retaken() {
        let kv = Arc::new(MemoryKv::new());
        let key = campaign_lock_key(Uuid::new_v4());
        let ttl = Duration::from_secs(120);

        assert!(kv.set_nx(&key, "1", ttl).await.unwrap());
        kv.del(&key).await.unwrap();
        assert!(kv.set_nx(&key, "1", ttl).await.unwrap());
    }
}
