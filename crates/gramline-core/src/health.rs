//! Account Health Monitor - abuse-signal tracking and eligibility gating
//!
//! Derived state (flood counter, pause marker, ban marker) lives in the
//! ephemeral store; every signal is also appended as a durable health event
//! when an event log is attached. State priority: banned > active pause >
//! warning > healthy. Banned is terminal until manually cleared.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gramline_common::types::{HealthEventType, HealthState};
use gramline_common::Result;
use gramline_storage::kv::KvStore;
use gramline_storage::repository::HealthEventRepository;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Current health standing of one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub state: HealthState,
    pub reason: Option<&'static str>,
    /// Seconds until an active pause lifts
    pub retry_after: Option<u64>,
}

impl HealthReport {
    fn healthy() -> Self {
        Self {
            state: HealthState::Healthy,
            reason: None,
            retry_after: None,
        }
    }

    /// Whether the account may send right now
    pub fn is_sendable(&self) -> bool {
        matches!(self.state, HealthState::Healthy | HealthState::Warning)
    }
}

/// Tracks abuse signals per account and derives a health state
pub struct AccountHealthMonitor {
    kv: Arc<dyn KvStore>,
    events: Option<HealthEventRepository>,
    flood_threshold: i64,
    flood_window_minutes: i64,
    pause_minutes: i64,
}

impl AccountHealthMonitor {
    /// Create a monitor with default thresholds (3 signals / 60 min window /
    /// 120 min pause)
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            events: None,
            flood_threshold: 3,
            flood_window_minutes: 60,
            pause_minutes: 120,
        }
    }

    /// Override thresholds
    pub fn with_thresholds(
        mut self,
        flood_threshold: i64,
        flood_window_minutes: i64,
        pause_minutes: i64,
    ) -> Self {
        self.flood_threshold = flood_threshold;
        self.flood_window_minutes = flood_window_minutes;
        self.pause_minutes = pause_minutes;
        self
    }

    /// Attach the durable audit log
    pub fn with_event_log(mut self, events: HealthEventRepository) -> Self {
        self.events = Some(events);
        self
    }

    fn flood_key(account_id: Uuid) -> String {
        format!("acct:{}:flood", account_id)
    }

    fn pause_key(account_id: Uuid) -> String {
        format!("acct:{}:paused_until", account_id)
    }

    fn ban_key(account_id: Uuid) -> String {
        format!("acct:{}:banned", account_id)
    }

    /// Record a transport rate-control signal.
    ///
    /// Hitting the threshold within the rolling window pauses the account.
    pub async fn record_floodwait(&self, account_id: Uuid, seconds: u64) -> Result<()> {
        let key = Self::flood_key(account_id);
        let count = self.kv.incr(&key).await?;
        self.kv
            .expire_at(
                &key,
                Utc::now() + ChronoDuration::minutes(self.flood_window_minutes),
            )
            .await?;

        warn!(account = %account_id, seconds, count, "Rate-control signal recorded");

        self.append_event(
            account_id,
            HealthEventType::Floodwait,
            Some(&format!("{}s", seconds)),
        )
        .await;

        if count >= self.flood_threshold {
            self.pause_account(account_id).await?;
        }

        Ok(())
    }

    /// Record a write-forbidden signal; marks the account banned
    pub async fn record_write_forbidden(&self, account_id: Uuid) -> Result<()> {
        warn!(account = %account_id, "Write forbidden");
        self.append_event(account_id, HealthEventType::WriteForbidden, None)
            .await;
        self.mark_banned(account_id).await
    }

    /// Record an explicit ban signal
    pub async fn record_ban(&self, account_id: Uuid) -> Result<()> {
        error!(account = %account_id, "Account marked as banned");
        self.append_event(account_id, HealthEventType::Banned, None)
            .await;
        self.mark_banned(account_id).await
    }

    async fn mark_banned(&self, account_id: Uuid) -> Result<()> {
        // No expiry: banned stays until manually cleared
        self.kv.set(&Self::ban_key(account_id), "1", None).await
    }

    async fn pause_account(&self, account_id: Uuid) -> Result<()> {
        let paused_until = Utc::now() + ChronoDuration::minutes(self.pause_minutes);
        self.kv
            .set(&Self::pause_key(account_id), &paused_until.to_rfc3339(), None)
            .await?;

        warn!(account = %account_id, until = %paused_until, "Account paused");

        self.append_event(
            account_id,
            HealthEventType::Paused,
            Some(&format!("until {}", paused_until.to_rfc3339())),
        )
        .await;

        Ok(())
    }

    /// Derive the account's current health state.
    ///
    /// Stale pause markers whose expiry has passed are cleaned up here.
    pub async fn check_health(&self, account_id: Uuid) -> Result<HealthReport> {
        if self.kv.exists(&Self::ban_key(account_id)).await? {
            return Ok(HealthReport {
                state: HealthState::Banned,
                reason: Some("ACCOUNT_BANNED"),
                retry_after: None,
            });
        }

        let pause_key = Self::pause_key(account_id);
        if let Some(raw) = self.kv.get(&pause_key).await? {
            match DateTime::parse_from_rfc3339(&raw) {
                Ok(paused_until) => {
                    let paused_until = paused_until.with_timezone(&Utc);
                    let now = Utc::now();
                    if now < paused_until {
                        return Ok(HealthReport {
                            state: HealthState::Paused,
                            reason: Some("TEMPORARY_PAUSE"),
                            retry_after: Some((paused_until - now).num_seconds().max(0) as u64),
                        });
                    }
                    self.kv.del(&pause_key).await?;
                }
                Err(_) => {
                    self.kv.del(&pause_key).await?;
                }
            }
        }

        let flood_count = self
            .kv
            .get(&Self::flood_key(account_id))
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        if flood_count > 0 {
            return Ok(HealthReport {
                state: HealthState::Warning,
                reason: Some("RECENT_FLOODWAIT"),
                retry_after: None,
            });
        }

        Ok(HealthReport::healthy())
    }

    /// Clear the ban marker (manual intervention path)
    pub async fn clear_ban(&self, account_id: Uuid) -> Result<()> {
        self.kv.del(&Self::ban_key(account_id)).await
    }

    async fn append_event(
        &self,
        account_id: Uuid,
        event_type: HealthEventType,
        details: Option<&str>,
    ) {
        if let Some(events) = &self.events {
            if let Err(e) = events.append(account_id, event_type, details).await {
                error!(account = %account_id, "Failed to append health event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramline_storage::kv::MemoryKv;

    fn monitor() -> (Arc<MemoryKv>, AccountHealthMonitor) {
        let kv = Arc::new(MemoryKv::new());
        let monitor = AccountHealthMonitor::new(kv.clone());
        (kv, monitor)
    }

    #[tokio::test]
    async fn fresh_account_is_healthy() {
        let (_, monitor) = monitor();
        let report = monitor.check_health(Uuid::new_v4()).await.unwrap();
        assert_eq!(report.state, HealthState::Healthy);
        assert!(report.is_sendable());
    }

    #[tokio::test]
    async fn one_floodwait_is_a_warning() {
        let (_, monitor) = monitor();
        let account = Uuid::new_v4();

        monitor.record_floodwait(account, 30).await.unwrap();

        let report = monitor.check_health(account).await.unwrap();
        assert_eq!(report.state, HealthState::Warning);
        assert!(report.is_sendable());
    }

    #[tokio::test]
    async fn three_floodwaits_pause_the_account() {
        let (_, monitor) = monitor();
        let account = Uuid::new_v4();

        for _ in 0..3 {
            monitor.record_floodwait(account, 30).await.unwrap();
        }

        let report = monitor.check_health(account).await.unwrap();
        assert_eq!(report.state, HealthState::Paused);
        assert!(!report.is_sendable());
        // Pause runs roughly the configured 120 minutes
        let retry = report.retry_after.unwrap();
        assert!(retry > 7100 && retry <= 7200);
    }

    #[tokio::test]
    async fn expired_pause_clears_to_warning() {
        let (kv, monitor) = monitor();
        let account = Uuid::new_v4();

        monitor.record_floodwait(account, 30).await.unwrap();

        // Force the pause marker into the past
        let stale = (Utc::now() - ChronoDuration::minutes(5)).to_rfc3339();
        kv.set(&AccountHealthMonitor::pause_key(account), &stale, None)
            .await
            .unwrap();

        let report = monitor.check_health(account).await.unwrap();
        assert_eq!(report.state, HealthState::Warning);

        // The stale marker was removed
        assert!(!kv
            .exists(&AccountHealthMonitor::pause_key(account))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn ban_wins_over_everything() {
        let (_, monitor) = monitor();
        let account = Uuid::new_v4();

        for _ in 0..3 {
            monitor.record_floodwait(account, 30).await.unwrap();
        }
        monitor.record_ban(account).await.unwrap();

        let report = monitor.check_health(account).await.unwrap();
        assert_eq!(report.state, HealthState::Banned);
        assert_eq!(report.reason, Some("ACCOUNT_BANNED"));

        monitor.clear_ban(account).await.unwrap();
        let report = monitor.check_health(account).await.unwrap();
        assert_ne!(report.state, HealthState::Banned);
    }

    #[tokio::test]
    async fn write_forbidden_marks_banned() {
        let (_, monitor) = monitor();
        let account = Uuid::new_v4();

        monitor.record_write_forbidden(account).await.unwrap();

        let report = monitor.check_health(account).await.unwrap();
        assert_eq!(report.state, HealthState::Banned);
    }
}
