//! Rate Limiter - Per-account daily limits and per-group cooldowns
//!
//! Backed by the ephemeral counter store. Daily counters expire at the next
//! UTC midnight so exhausted accounts self-clear; cooldown markers carry a
//! TTL equal to the cooldown so their mere existence means "still cooling".
//! Counters are only advanced after a confirmed send - failed attempts are
//! never charged.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use gramline_common::Result;
use gramline_storage::kv::KvStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Denial reason: today's send allowance is used up
pub const REASON_ACCOUNT_DAILY_LIMIT: &str = "ACCOUNT_DAILY_LIMIT";

/// Denial reason: this (account, group) pair is still cooling down
pub const REASON_GROUP_COOLDOWN: &str = "GROUP_COOLDOWN";

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub reason: Option<&'static str>,
    /// Suggested wait before retrying, in seconds
    pub retry_after: Option<u64>,
}

impl RateLimitResult {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after: None,
        }
    }

    fn deny(reason: &'static str, retry_after: u64) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            retry_after: Some(retry_after),
        }
    }
}

/// Rate limiter for accounts and groups
pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn account_day_key(account_id: Uuid, day: NaiveDate) -> String {
        format!("acct:{}:count:{}", account_id, day.format("%Y-%m-%d"))
    }

    fn group_last_post_key(account_id: Uuid, group_id: Uuid) -> String {
        format!("acct:{}:group:{}:last_post", account_id, group_id)
    }

    /// Check the account's daily allowance
    pub async fn check_account_limit(
        &self,
        account_id: Uuid,
        daily_limit: i64,
    ) -> Result<RateLimitResult> {
        let key = Self::account_day_key(account_id, Utc::now().date_naive());
        let count = self
            .kv
            .get(&key)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        if count >= daily_limit {
            warn!(account = %account_id, count, daily_limit, "Account daily limit reached");
            return Ok(RateLimitResult::deny(
                REASON_ACCOUNT_DAILY_LIMIT,
                seconds_until_utc_midnight(Utc::now()),
            ));
        }

        Ok(RateLimitResult::allow())
    }

    /// Record one confirmed send against the account's daily counter.
    ///
    /// The counter expires at the next UTC midnight, so a previously exhausted
    /// account is allowed again without manual reset.
    pub async fn increment_account(&self, account_id: Uuid) -> Result<()> {
        let now = Utc::now();
        let key = Self::account_day_key(account_id, now.date_naive());
        self.kv.incr(&key).await?;
        self.kv.expire_at(&key, next_utc_midnight(now)).await?;
        Ok(())
    }

    /// Check the per-(account, group) cooldown
    pub async fn check_group_cooldown(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        cooldown_minutes: i64,
    ) -> Result<RateLimitResult> {
        let key = Self::group_last_post_key(account_id, group_id);

        if let Some(raw) = self.kv.get(&key).await? {
            if let Ok(last_post) = DateTime::parse_from_rfc3339(&raw) {
                let next_allowed =
                    last_post.with_timezone(&Utc) + ChronoDuration::minutes(cooldown_minutes);
                let now = Utc::now();

                if now < next_allowed {
                    let retry_after = (next_allowed - now).num_seconds().max(0) as u64;
                    warn!(
                        account = %account_id,
                        group = %group_id,
                        retry_after,
                        "Group cooldown active"
                    );
                    return Ok(RateLimitResult::deny(REASON_GROUP_COOLDOWN, retry_after));
                }
            }
        }

        Ok(RateLimitResult::allow())
    }

    /// Mark a group as posted to; the marker clears itself after the cooldown
    pub async fn mark_group_posted(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        cooldown_minutes: i64,
    ) -> Result<()> {
        let key = Self::group_last_post_key(account_id, group_id);
        self.kv
            .set(
                &key,
                &Utc::now().to_rfc3339(),
                Some(Duration::from_secs(cooldown_minutes.max(1) as u64 * 60)),
            )
            .await
    }

    /// Account and group checks in order; the cheaper account check
    /// short-circuits first
    pub async fn check_all(
        &self,
        account_id: Uuid,
        daily_limit: i64,
        group_id: Uuid,
        cooldown_minutes: i64,
    ) -> Result<RateLimitResult> {
        let acct = self.check_account_limit(account_id, daily_limit).await?;
        if !acct.allowed {
            return Ok(acct);
        }

        self.check_group_cooldown(account_id, group_id, cooldown_minutes)
            .await
    }
}

/// The next UTC midnight after `now`
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + ChronoDuration::days(1);
    tomorrow
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
}

/// Seconds remaining until the next UTC midnight
pub fn seconds_until_utc_midnight(now: DateTime<Utc>) -> u64 {
    (next_utc_midnight(now) - now).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramline_storage::kv::MemoryKv;

    fn limiter() -> (Arc<MemoryKv>, RateLimiter) {
        let kv = Arc::new(MemoryKv::new());
        let limiter = RateLimiter::new(kv.clone());
        (kv, limiter)
    }

    #[tokio::test]
    async fn account_allowed_below_limit() {
        let (_, limiter) = limiter();
        let account = Uuid::new_v4();

        for _ in 0..39 {
            limiter.increment_account(account).await.unwrap();
        }

        let result = limiter.check_account_limit(account, 40).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn account_denied_at_limit() {
        let (_, limiter) = limiter();
        let account = Uuid::new_v4();

        for _ in 0..40 {
            limiter.increment_account(account).await.unwrap();
        }

        let result = limiter.check_account_limit(account, 40).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, Some(REASON_ACCOUNT_DAILY_LIMIT));

        // Retry delay points at the next UTC midnight
        let expected = seconds_until_utc_midnight(Utc::now());
        let got = result.retry_after.unwrap();
        assert!(got.abs_diff(expected) <= 1);
    }

    #[tokio::test]
    async fn yesterdays_counter_does_not_block_today() {
        let (kv, limiter) = limiter();
        let account = Uuid::new_v4();

        let yesterday = Utc::now().date_naive() - ChronoDuration::days(1);
        let key = RateLimiter::account_day_key(account, yesterday);
        kv.set(&key, "40", None).await.unwrap();

        let result = limiter.check_account_limit(account, 40).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn group_cooldown_denies_until_elapsed() {
        let (kv, limiter) = limiter();
        let account = Uuid::new_v4();
        let group = Uuid::new_v4();

        limiter.mark_group_posted(account, group, 60).await.unwrap();

        let result = limiter
            .check_group_cooldown(account, group, 60)
            .await
            .unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, Some(REASON_GROUP_COOLDOWN));
        assert!(result.retry_after.unwrap() <= 3600);

        // A last-post stamp older than the cooldown no longer blocks
        let key = RateLimiter::group_last_post_key(account, group);
        let stale = (Utc::now() - ChronoDuration::minutes(61)).to_rfc3339();
        kv.set(&key, &stale, None).await.unwrap();

        let result = limiter
            .check_group_cooldown(account, group, 60)
            .await
            .unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn unified_check_reports_account_limit_first() {
        let (_, limiter) = limiter();
        let account = Uuid::new_v4();
        let group = Uuid::new_v4();

        limiter.increment_account(account).await.unwrap();
        limiter.mark_group_posted(account, group, 60).await.unwrap();

        // Both gates would deny; the account gate wins
        let result = limiter.check_all(account, 1, group, 60).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, Some(REASON_ACCOUNT_DAILY_LIMIT));

        // With account headroom, the group gate reports
        let result = limiter.check_all(account, 40, group, 60).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, Some(REASON_GROUP_COOLDOWN));
    }

    #[test]
    fn midnight_math() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T23:59:30Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(seconds_until_utc_midnight(now), 30);

        let midnight = next_utc_midnight(now);
        assert_eq!(midnight.to_rfc3339(), "2024-06-02T00:00:00+00:00");
    }
}
