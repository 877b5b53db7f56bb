//! Target Selector - picks the next eligible (campaign, group) pair for an
//! account

use crate::limiter::RateLimiter;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gramline_common::types::CampaignStatus;
use gramline_storage::db::DatabasePool;
use gramline_storage::models::{Account, Campaign, Group};
use gramline_storage::repository::{CampaignRepository, MessageLogRepository};
use std::sync::Arc;
use tracing::debug;

/// Evaluate the campaign send invariant: active, inside its window, and the
/// interval has elapsed since the last recorded send.
pub fn campaign_is_due(
    campaign: &Campaign,
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if campaign.status_enum() != Some(CampaignStatus::Active) {
        return false;
    }

    if let Some(start_at) = campaign.start_at {
        if now < start_at {
            return false;
        }
    }

    if let Some(end_at) = campaign.end_at {
        if now > end_at {
            return false;
        }
    }

    match last_sent {
        Some(at) => now - at >= ChronoDuration::minutes(campaign.interval_minutes as i64),
        None => true,
    }
}

/// One eligible send target
#[derive(Debug, Clone)]
pub struct CampaignTarget {
    pub campaign: Campaign,
    pub group: Group,
    pub message_template: String,
}

/// Selects the next eligible (campaign, group) pair for an account
pub struct TargetSelector {
    campaigns: CampaignRepository,
    logs: MessageLogRepository,
    limiter: Arc<RateLimiter>,
}

impl TargetSelector {
    /// Create a new target selector
    pub fn new(db_pool: &DatabasePool, limiter: Arc<RateLimiter>) -> Self {
        let pool = db_pool.pool().clone();
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            logs: MessageLogRepository::new(pool),
            limiter,
        }
    }

    /// Pick at most one (campaign, group) pair for this account.
    ///
    /// Campaigns are scanned oldest-first so earlier campaigns are preferred
    /// each pass without starving later ones; within a due campaign, groups
    /// are scanned in association order and the first cooldown-clear one
    /// wins.
    pub async fn next_target(&self, account: &Account) -> Result<Option<CampaignTarget>> {
        let Some(customer_id) = account.customer_id else {
            return Ok(None);
        };

        let campaigns = self.campaigns.list_active_by_customer(customer_id).await?;
        let now = Utc::now();

        for campaign in campaigns {
            let last_sent = self.logs.last_sent_at(campaign.id).await?;
            if !campaign_is_due(&campaign, last_sent, now) {
                continue;
            }

            let groups = self.campaigns.groups(campaign.id).await?;

            for group in groups {
                if !group.allow_ads {
                    continue;
                }

                let check = self
                    .limiter
                    .check_group_cooldown(account.id, group.id, group.cooldown_minutes as i64)
                    .await?;

                if check.allowed {
                    debug!(
                        campaign = %campaign.id,
                        group = %group.id,
                        account = %account.phone_number,
                        "Selected target"
                    );

                    return Ok(Some(CampaignTarget {
                        message_template: campaign.message_template.clone(),
                        campaign,
                        group,
                    }));
                }
            }
            // All of this campaign's groups are cooling down; try the next one
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn campaign(status: &str, interval_minutes: i32) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            name: "launch".to_string(),
            message_template: "hello".to_string(),
            interval_minutes,
            start_at: None,
            end_at: None,
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn due_only_when_active() {
        let now = Utc::now();
        for status in ["draft", "paused", "completed"] {
            assert!(!campaign_is_due(&campaign(status, 30), None, now));
        }
        assert!(campaign_is_due(&campaign("active", 30), None, now));
    }

    #[test]
    fn interval_must_elapse() {
        let now = Utc::now();
        let c = campaign("active", 30);

        // Sent 10 minutes ago with a 30 minute interval: not due
        let last = Some(now - ChronoDuration::minutes(10));
        assert!(!campaign_is_due(&c, last, now));

        // 30 minutes later with no newer send: due
        let later = now + ChronoDuration::minutes(30);
        assert!(campaign_is_due(&c, last, later));
    }

    #[test]
    fn window_bounds_are_honored() {
        let now = Utc::now();

        let mut c = campaign("active", 30);
        c.start_at = Some(now + ChronoDuration::hours(1));
        assert!(!campaign_is_due(&c, None, now));

        let mut c = campaign("active", 30);
        c.end_at = Some(now - ChronoDuration::hours(1));
        assert!(!campaign_is_due(&c, None, now));

        let mut c = campaign("active", 30);
        c.start_at = Some(now - ChronoDuration::hours(1));
        c.end_at = Some(now + ChronoDuration::hours(1));
        assert!(campaign_is_due(&c, None, now));
    }

    #[test]
    fn never_sent_campaign_is_due() {
        let now = Utc::now();
        assert!(campaign_is_due(&campaign("active", 30), None, now));
    }
}
