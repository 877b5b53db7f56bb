//! Campaign Executor - one bounded processing pass for one campaign
//!
//! Runs under the scheduler's per-campaign lock. Dispatches through the
//! campaign's owner accounts sequentially, one send each at most, sharing
//! every gate (warmup, daily limit, health, cooldown) with the per-account
//! send workers.

use crate::dispatch::{MessageDispatcher, SendDisposition};
use crate::health::AccountHealthMonitor;
use crate::limiter::RateLimiter;
use crate::warmup::WarmupController;
use anyhow::Result;
use chrono::Utc;
use gramline_common::plans::get_plan;
use gramline_storage::db::DatabasePool;
use gramline_storage::models::Group;
use gramline_storage::repository::{
    AccountRepository, CampaignRepository, CustomerRepository, DailyUsageRepository,
    MessageLogRepository,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::selector::campaign_is_due;

/// Executes one campaign tick
pub struct CampaignExecutor {
    campaigns: CampaignRepository,
    accounts: AccountRepository,
    customers: CustomerRepository,
    usage: DailyUsageRepository,
    logs: MessageLogRepository,
    limiter: Arc<RateLimiter>,
    monitor: Arc<AccountHealthMonitor>,
    warmup: WarmupController,
    dispatcher: Arc<MessageDispatcher>,
    min_send_delay_secs: u64,
    max_send_delay_secs: u64,
    token: CancellationToken,
}

impl CampaignExecutor {
    /// Create a new campaign executor
    pub fn new(
        db_pool: &DatabasePool,
        limiter: Arc<RateLimiter>,
        monitor: Arc<AccountHealthMonitor>,
        warmup: WarmupController,
        dispatcher: Arc<MessageDispatcher>,
        token: CancellationToken,
    ) -> Self {
        let pool = db_pool.pool().clone();
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            accounts: AccountRepository::new(pool.clone()),
            customers: CustomerRepository::new(pool.clone()),
            usage: DailyUsageRepository::new(pool.clone()),
            logs: MessageLogRepository::new(pool),
            limiter,
            monitor,
            warmup,
            dispatcher,
            min_send_delay_secs: 45,
            max_send_delay_secs: 120,
            token,
        }
    }

    /// Override the randomized inter-send delay bounds
    pub fn with_send_delays(mut self, min_secs: u64, max_secs: u64) -> Self {
        self.min_send_delay_secs = min_secs;
        self.max_send_delay_secs = max_secs;
        self
    }

    /// Run one processing tick for a campaign.
    ///
    /// Caller must hold the campaign's lock.
    pub async fn run_once(&self, campaign_id: Uuid) -> Result<()> {
        let Some(campaign) = self.campaigns.get(campaign_id).await? else {
            warn!(campaign = %campaign_id, "Campaign vanished before its tick");
            return Ok(());
        };

        // Re-check due-ness under the lock; another pass may have sent already
        let last_sent = self.logs.last_sent_at(campaign.id).await?;
        if !campaign_is_due(&campaign, last_sent, Utc::now()) {
            debug!(campaign = %campaign.id, "Campaign no longer due");
            return Ok(());
        }

        let Some(customer) = self.customers.get(campaign.customer_id).await? else {
            warn!(campaign = %campaign.id, "Campaign has no owner");
            return Ok(());
        };

        let plan = match get_plan(&customer.plan) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(customer = %customer.id, "Cannot resolve plan: {}", e);
                return Ok(());
            }
        };

        if (campaign.interval_minutes as i64) < plan.min_interval_minutes {
            warn!(
                campaign = %campaign.id,
                interval = campaign.interval_minutes,
                minimum = plan.min_interval_minutes,
                "Campaign interval below plan minimum; skipping tick"
            );
            return Ok(());
        }

        let accounts = self
            .accounts
            .list_sendable_by_customer(customer.id, plan.accounts)
            .await?;

        if accounts.is_empty() {
            warn!(campaign = %campaign.id, "No usable accounts");
            return Ok(());
        }

        let mut groups: Vec<Group> = self
            .campaigns
            .groups(campaign.id)
            .await?
            .into_iter()
            .filter(|g| g.allow_ads)
            .collect();
        if groups.is_empty() {
            warn!(campaign = %campaign.id, "Campaign has no target groups");
            return Ok(());
        }
        groups.shuffle(&mut rand::thread_rng());
        let mut groups: VecDeque<Group> = groups.into();

        info!(
            campaign = %campaign.id,
            accounts = accounts.len(),
            groups = groups.len(),
            "Campaign tick started"
        );

        for mut account in accounts {
            if self.token.is_cancelled() {
                break;
            }

            self.usage.ensure_today(account.id).await?;
            self.warmup.apply(&self.accounts, &mut account).await?;

            let daily_limit =
                (account.daily_message_limit as i64).min(plan.daily_messages_per_account);
            let limit = self
                .limiter
                .check_account_limit(account.id, daily_limit)
                .await?;
            if !limit.allowed {
                info!(account = %account.phone_number, "Account exhausted for today");
                continue;
            }

            let health = self.monitor.check_health(account.id).await?;
            if !health.is_sendable() {
                info!(
                    account = %account.phone_number,
                    state = %health.state,
                    "Account not healthy; skipping"
                );
                continue;
            }

            let Some(group) = self.next_clear_group(&account.id, &mut groups).await? else {
                debug!(campaign = %campaign.id, "No cooldown-clear groups left");
                break;
            };

            match self
                .dispatcher
                .dispatch(&account, &campaign, &group)
                .await?
            {
                SendDisposition::Sent => {}
                SendDisposition::Backoff(_) | SendDisposition::Failed => {
                    // Recorded by the dispatcher; this pass moves on
                }
                SendDisposition::AccountHalted => continue,
            }

            if self.pause_between_sends().await {
                break;
            }
        }

        info!(campaign = %campaign.id, "Campaign tick finished");
        Ok(())
    }

    /// Pop the first group whose cooldown is clear for this account
    async fn next_clear_group(
        &self,
        account_id: &Uuid,
        groups: &mut VecDeque<Group>,
    ) -> Result<Option<Group>> {
        let mut passed_over = VecDeque::new();

        let picked = loop {
            let Some(group) = groups.pop_front() else {
                break None;
            };

            let check = self
                .limiter
                .check_group_cooldown(*account_id, group.id, group.cooldown_minutes as i64)
                .await?;

            if check.allowed {
                break Some(group);
            }
            passed_over.push_back(group);
        };

        // Cooling groups stay in the pool for the other accounts
        groups.append(&mut passed_over);
        Ok(picked)
    }

    /// Randomized human-like delay; returns true when cancelled
    async fn pause_between_sends(&self) -> bool {
        let secs =
            rand::thread_rng().gen_range(self.min_send_delay_secs..=self.max_send_delay_secs);
        tokio::select! {
            _ = self.token.cancelled() => true,
            _ = tokio::time::sleep(Duration::from_secs(secs)) => false,
        }
    }
}
