//! Message dispatch - one connect+send attempt with full outcome recording
//!
//! Shared by the campaign executor and the per-account send workers so both
//! paths record outcomes identically. Quota counters are only advanced after
//! the transport confirmed the send.

use crate::health::AccountHealthMonitor;
use crate::limiter::RateLimiter;
use crate::transport::{AccountCredentials, ClientFactory, ConnectOutcome, SendOutcome};
use crate::variator::MessageVariator;
use anyhow::Result;
use gramline_common::types::{AccountStatus, MessageLogStatus};
use gramline_storage::db::DatabasePool;
use gramline_storage::models::{Account, Campaign, CreateMessageLog, Group};
use gramline_storage::repository::{AccountRepository, DailyUsageRepository, MessageLogRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Safety margin added on top of a transport-reported backoff
const FLOOD_WAIT_MARGIN_SECS: u64 = 10;

/// What the caller should do after one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDisposition {
    /// Sent and recorded
    Sent,
    /// Failed; wait this long before the next attempt
    Backoff(Duration),
    /// Failed; no specific wait required
    Failed,
    /// The account cannot send anymore (session lost or banned)
    AccountHalted,
}

/// Wait for a transport-reported rate-control signal plus margin
pub fn flood_backoff(seconds: u64) -> Duration {
    Duration::from_secs(seconds + FLOOD_WAIT_MARGIN_SECS)
}

/// Performs one send attempt end to end
pub struct MessageDispatcher {
    accounts: AccountRepository,
    usage: DailyUsageRepository,
    logs: MessageLogRepository,
    limiter: Arc<RateLimiter>,
    monitor: Arc<AccountHealthMonitor>,
    variator: MessageVariator,
    clients: Arc<dyn ClientFactory>,
    protocol_backoff: Duration,
}

impl MessageDispatcher {
    /// Create a new dispatcher
    pub fn new(
        db_pool: &DatabasePool,
        limiter: Arc<RateLimiter>,
        monitor: Arc<AccountHealthMonitor>,
        clients: Arc<dyn ClientFactory>,
        protocol_backoff: Duration,
    ) -> Self {
        let pool = db_pool.pool().clone();
        Self {
            accounts: AccountRepository::new(pool.clone()),
            usage: DailyUsageRepository::new(pool.clone()),
            logs: MessageLogRepository::new(pool),
            limiter,
            monitor,
            variator: MessageVariator::new(),
            clients,
            protocol_backoff,
        }
    }

    /// Vary, connect, send, and record one message
    pub async fn dispatch(
        &self,
        account: &Account,
        campaign: &Campaign,
        group: &Group,
    ) -> Result<SendDisposition> {
        let Some(target) = group.target_identifier() else {
            warn!(group = %group.id, "Group has no usable target identifier");
            self.log_attempt(
                account,
                campaign,
                group,
                "-",
                None,
                MessageLogStatus::Skipped,
                Some("NO_TARGET"),
                None,
            )
            .await;
            return Ok(SendDisposition::Failed);
        };

        let text = self.variator.vary(&campaign.message_template);
        let credentials = AccountCredentials::from(account);
        let mut client = self.clients.client();

        match client.connect(&credentials).await {
            ConnectOutcome::Connected => {}
            ConnectOutcome::AuthenticationRequired => {
                client.disconnect().await;
                warn!(account = %account.phone_number, "Session not authorized");
                self.monitor.record_ban(account.id).await?;
                self.accounts
                    .update_status(account.id, AccountStatus::Banned)
                    .await?;
                self.log_attempt(
                    account,
                    campaign,
                    group,
                    &target,
                    None,
                    MessageLogStatus::Failed,
                    Some("AUTH_REQUIRED"),
                    None,
                )
                .await;
                return Ok(SendDisposition::AccountHalted);
            }
            ConnectOutcome::RateControlled(seconds) => {
                client.disconnect().await;
                self.monitor.record_floodwait(account.id, seconds).await?;
                self.log_attempt(
                    account,
                    campaign,
                    group,
                    &target,
                    None,
                    MessageLogStatus::Failed,
                    Some("FLOOD_WAIT"),
                    Some(seconds as i32),
                )
                .await;
                return Ok(SendDisposition::Backoff(flood_backoff(seconds)));
            }
        }

        let outcome = client.send(&target, &text).await;
        client.disconnect().await;

        match outcome {
            SendOutcome::Ok => {
                self.record_success(account, campaign, group, &target, &text)
                    .await?;
                Ok(SendDisposition::Sent)
            }
            SendOutcome::RateControlled(seconds) => {
                self.monitor.record_floodwait(account.id, seconds).await?;
                self.log_attempt(
                    account,
                    campaign,
                    group,
                    &target,
                    None,
                    MessageLogStatus::Failed,
                    outcome.error_code(),
                    Some(seconds as i32),
                )
                .await;
                Ok(SendDisposition::Backoff(flood_backoff(seconds)))
            }
            SendOutcome::WriteForbidden => {
                self.monitor.record_write_forbidden(account.id).await?;
                self.log_attempt(
                    account,
                    campaign,
                    group,
                    &target,
                    None,
                    MessageLogStatus::Failed,
                    outcome.error_code(),
                    None,
                )
                .await;
                Ok(SendDisposition::AccountHalted)
            }
            SendOutcome::ProtocolError(ref detail) | SendOutcome::Unknown(ref detail) => {
                warn!(
                    account = %account.phone_number,
                    target = %target,
                    "Send failed: {}",
                    detail
                );
                self.log_attempt(
                    account,
                    campaign,
                    group,
                    &target,
                    None,
                    MessageLogStatus::Failed,
                    outcome.error_code(),
                    None,
                )
                .await;
                Ok(SendDisposition::Backoff(self.protocol_backoff))
            }
        }
    }

    /// Bookkeeping after a confirmed send.
    ///
    /// Each step commits independently; a crash in between produces a send
    /// that is not fully accounted (accepted: at-least-once delivery with
    /// eventually-consistent accounting).
    async fn record_success(
        &self,
        account: &Account,
        campaign: &Campaign,
        group: &Group,
        target: &str,
        text: &str,
    ) -> Result<()> {
        self.limiter.increment_account(account.id).await?;
        self.limiter
            .mark_group_posted(account.id, group.id, group.cooldown_minutes as i64)
            .await?;
        self.usage.increment_today(account.id).await?;
        self.log_attempt(
            account,
            campaign,
            group,
            target,
            Some(text),
            MessageLogStatus::Sent,
            None,
            None,
        )
        .await;
        self.accounts.touch_last_used(account.id).await?;

        info!(
            account = %account.phone_number,
            campaign = %campaign.id,
            target = %target,
            "Message sent"
        );

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_attempt(
        &self,
        account: &Account,
        campaign: &Campaign,
        group: &Group,
        target: &str,
        text: Option<&str>,
        status: MessageLogStatus,
        error_code: Option<&str>,
        flood_wait_seconds: Option<i32>,
    ) {
        let entry = CreateMessageLog {
            campaign_id: Some(campaign.id),
            account_id: Some(account.id),
            group_id: Some(group.id),
            target: target.to_string(),
            message_text: text.map(|t| t.to_string()),
            status: status.to_string(),
            error_code: error_code.map(|c| c.to_string()),
            flood_wait_seconds,
        };

        if let Err(e) = self.logs.append(entry).await {
            error!(campaign = %campaign.id, "Failed to append message log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_backoff_adds_margin() {
        assert_eq!(flood_backoff(30), Duration::from_secs(40));
        assert_eq!(flood_backoff(0), Duration::from_secs(10));
    }
}
