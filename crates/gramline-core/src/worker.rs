//! Send Worker - one independent loop per active account
//!
//! Each iteration gates on usage/warmup/limits/health, asks the target
//! selector for work, dispatches one send, and sleeps. Every per-iteration
//! fault is caught at the loop boundary; only cancellation (or a terminal
//! ban) ends the loop.

use crate::campaigns::TargetSelector;
use crate::dispatch::{MessageDispatcher, SendDisposition};
use crate::health::AccountHealthMonitor;
use crate::limiter::RateLimiter;
use crate::warmup::WarmupController;
use anyhow::Result;
use gramline_common::config::WorkerConfig;
use gramline_common::types::{AccountStatus, HealthState};
use gramline_storage::db::DatabasePool;
use gramline_storage::repository::{AccountRepository, DailyUsageRepository};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What one loop iteration decided
enum IterationOutcome {
    /// Sleep this long, then iterate again
    Sleep(Duration),
    /// Stop the loop for good (account gone, banned, or no longer sendable)
    Halt,
}

/// Shared collaborators handed to every worker
#[derive(Clone)]
pub struct WorkerContext {
    pub accounts: AccountRepository,
    pub usage: DailyUsageRepository,
    pub limiter: Arc<RateLimiter>,
    pub monitor: Arc<AccountHealthMonitor>,
    pub selector: Arc<TargetSelector>,
    pub warmup: WarmupController,
    pub dispatcher: Arc<MessageDispatcher>,
    pub config: WorkerConfig,
}

impl WorkerContext {
    /// Assemble a worker context from the shared engine pieces
    pub fn new(
        db_pool: &DatabasePool,
        limiter: Arc<RateLimiter>,
        monitor: Arc<AccountHealthMonitor>,
        selector: Arc<TargetSelector>,
        warmup: WarmupController,
        dispatcher: Arc<MessageDispatcher>,
        config: WorkerConfig,
    ) -> Self {
        let pool = db_pool.pool().clone();
        Self {
            accounts: AccountRepository::new(pool.clone()),
            usage: DailyUsageRepository::new(pool),
            limiter,
            monitor,
            selector,
            warmup,
            dispatcher,
            config,
        }
    }
}

/// The per-account send loop
pub struct SendWorker {
    account_id: Uuid,
    ctx: WorkerContext,
    token: CancellationToken,
}

impl SendWorker {
    /// Create a worker for one account
    pub fn new(account_id: Uuid, ctx: WorkerContext, token: CancellationToken) -> Self {
        Self {
            account_id,
            ctx,
            token,
        }
    }

    /// Run until cancelled or the account becomes terminally unusable
    pub async fn run(self) {
        info!(account = %self.account_id, "Send worker started");

        loop {
            if self.token.is_cancelled() {
                break;
            }

            match self.run_iteration().await {
                Ok(IterationOutcome::Sleep(delay)) => {
                    if self.sleep(delay).await {
                        break;
                    }
                }
                Ok(IterationOutcome::Halt) => break,
                Err(e) => {
                    // The loop outlives any single fault
                    error!(account = %self.account_id, "Worker iteration failed: {}", e);
                    if self
                        .sleep(Duration::from_secs(self.ctx.config.idle_secs))
                        .await
                    {
                        break;
                    }
                }
            }
        }

        info!(account = %self.account_id, "Send worker stopped");
    }

    async fn run_iteration(&self) -> Result<IterationOutcome> {
        let Some(mut account) = self.ctx.accounts.get(self.account_id).await? else {
            warn!(account = %self.account_id, "Account no longer exists");
            return Ok(IterationOutcome::Halt);
        };

        if !account
            .status_enum()
            .is_some_and(|s| s.is_sendable())
        {
            info!(
                account = %account.phone_number,
                status = %account.status,
                "Account not sendable; stopping worker"
            );
            return Ok(IterationOutcome::Halt);
        }

        // Lazily create today's durable usage row (race-safe upsert)
        self.ctx.usage.ensure_today(account.id).await?;

        self.ctx
            .warmup
            .apply(&self.ctx.accounts, &mut account)
            .await?;

        let health = self.ctx.monitor.check_health(account.id).await?;
        match health.state {
            HealthState::Banned => {
                warn!(account = %account.phone_number, "Account banned; stopping worker");
                self.ctx
                    .accounts
                    .update_status(account.id, AccountStatus::Banned)
                    .await?;
                return Ok(IterationOutcome::Halt);
            }
            HealthState::Paused => {
                let wait = health
                    .retry_after
                    .unwrap_or(self.ctx.config.idle_secs);
                return Ok(IterationOutcome::Sleep(Duration::from_secs(wait)));
            }
            HealthState::Warning | HealthState::Healthy => {}
        }

        let limit = self
            .ctx
            .limiter
            .check_account_limit(account.id, account.daily_message_limit as i64)
            .await?;
        if !limit.allowed {
            // Sleeps through to the next UTC midnight
            let wait = limit.retry_after.unwrap_or(self.ctx.config.idle_secs);
            return Ok(IterationOutcome::Sleep(Duration::from_secs(wait)));
        }

        let Some(target) = self.ctx.selector.next_target(&account).await? else {
            return Ok(IterationOutcome::Sleep(Duration::from_secs(
                self.ctx.config.idle_secs,
            )));
        };

        // Re-check the cooldown right before sending; another loop may have
        // posted to this group since selection
        let cooldown = self
            .ctx
            .limiter
            .check_group_cooldown(
                account.id,
                target.group.id,
                target.group.cooldown_minutes as i64,
            )
            .await?;
        if !cooldown.allowed {
            let wait = cooldown
                .retry_after
                .unwrap_or(self.ctx.config.idle_secs)
                .min(self.ctx.config.cooldown_wait_cap_secs);
            return Ok(IterationOutcome::Sleep(Duration::from_secs(wait)));
        }

        match self
            .ctx
            .dispatcher
            .dispatch(&account, &target.campaign, &target.group)
            .await?
        {
            SendDisposition::Sent => Ok(IterationOutcome::Sleep(human_delay(
                self.ctx.config.min_send_delay_secs,
                self.ctx.config.max_send_delay_secs,
            ))),
            SendDisposition::Backoff(delay) => Ok(IterationOutcome::Sleep(delay)),
            SendDisposition::Failed => Ok(IterationOutcome::Sleep(Duration::from_secs(5))),
            SendDisposition::AccountHalted => Ok(IterationOutcome::Halt),
        }
    }

    /// Sleep unless cancelled; returns true when cancelled
    async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }
}

/// Randomized human-like delay between sends
fn human_delay(min_secs: u64, max_secs: u64) -> Duration {
    let max_secs = max_secs.max(min_secs);
    Duration::from_secs(rand::thread_rng().gen_range(min_secs..=max_secs))
}

/// Spawns and tracks one send worker per sendable account
pub struct WorkerSupervisor {
    ctx: WorkerContext,
    token: CancellationToken,
}

impl WorkerSupervisor {
    /// Create a new supervisor
    pub fn new(ctx: WorkerContext, token: CancellationToken) -> Self {
        Self { ctx, token }
    }

    /// Run until cancelled, rescanning for new accounts periodically
    pub async fn run(&self) {
        let mut handles: HashMap<Uuid, JoinHandle<()>> = HashMap::new();
        let mut ticker = interval(Duration::from_secs(self.ctx.config.rescan_secs));

        info!("Worker supervisor started");

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            handles.retain(|_, handle| !handle.is_finished());

            match self.ctx.accounts.list_sendable().await {
                Ok(accounts) => {
                    for account in accounts {
                        if handles.contains_key(&account.id) {
                            continue;
                        }

                        let worker = SendWorker::new(
                            account.id,
                            self.ctx.clone(),
                            self.token.clone(),
                        );
                        handles.insert(account.id, tokio::spawn(worker.run()));
                    }
                }
                Err(e) => error!("Failed to list sendable accounts: {}", e),
            }
        }

        // Workers observe the same token; wait for them to wind down
        for (_, handle) in handles {
            let _ = handle.await;
        }

        info!("Worker supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_delay_respects_bounds() {
        for _ in 0..100 {
            let delay = human_delay(45, 120);
            assert!((45..=120).contains(&delay.as_secs()));
        }
    }

    #[test]
    fn human_delay_tolerates_inverted_bounds() {
        assert_eq!(human_delay(60, 10), Duration::from_secs(60));
    }
}
