//! Warmup Controller - five-stage daily-volume ramp for new accounts
//!
//! Stage is derived from days since warmup start. Stages 1-4 draw the daily
//! limit from fixed randomized ranges and keep the account `warming`; stage 5
//! pins the steady-state limit and flips the account `active`, leaving the
//! warmup path for good.

use chrono::{DateTime, Utc};
use gramline_common::types::AccountStatus;
use gramline_storage::models::Account;
use gramline_storage::repository::AccountRepository;
use rand::Rng;
use tracing::debug;

/// Daily-limit ranges for stages 1-4 (inclusive bounds)
const STAGE_RANGES: [(i32, i32); 4] = [(5, 8), (10, 15), (20, 25), (30, 35)];

/// Computed warmup application for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupPlan {
    pub stage: i32,
    pub daily_limit: i32,
    pub status: AccountStatus,
    pub started_at: DateTime<Utc>,
}

/// Ramps new accounts up to steady-state volume
#[derive(Debug, Clone)]
pub struct WarmupController {
    steady_daily_limit: i32,
}

impl Default for WarmupController {
    fn default() -> Self {
        Self {
            steady_daily_limit: 45,
        }
    }
}

impl WarmupController {
    /// Create a controller with the given steady-state daily limit
    pub fn new(steady_daily_limit: i32) -> Self {
        Self { steady_daily_limit }
    }

    /// Compute the warmup state for an account at `now`.
    ///
    /// First application stamps `now` as the warmup start.
    pub fn plan(&self, account: &Account, now: DateTime<Utc>) -> WarmupPlan {
        let started_at = account.warmup_started_at.unwrap_or(now);
        let days_elapsed = (now - started_at).num_days().max(0);
        let stage = (days_elapsed + 1).min(5) as i32;

        if stage <= 4 {
            let (low, high) = STAGE_RANGES[(stage - 1) as usize];
            WarmupPlan {
                stage,
                daily_limit: rand::thread_rng().gen_range(low..=high),
                status: AccountStatus::Warming,
                started_at,
            }
        } else {
            WarmupPlan {
                stage: 5,
                daily_limit: self.steady_daily_limit,
                status: AccountStatus::Active,
                started_at,
            }
        }
    }

    /// Apply warmup to the account and persist the result.
    ///
    /// No-op once the ramp has completed.
    pub async fn apply(
        &self,
        repo: &AccountRepository,
        account: &mut Account,
    ) -> Result<(), sqlx::Error> {
        if account.warmup_done() {
            return Ok(());
        }

        let plan = self.plan(account, Utc::now());

        debug!(
            account = %account.id,
            stage = plan.stage,
            daily_limit = plan.daily_limit,
            "Applying warmup"
        );

        repo.apply_warmup(
            account.id,
            plan.stage,
            plan.daily_limit,
            plan.status,
            plan.started_at,
        )
        .await?;

        account.warmup_stage = plan.stage;
        account.daily_message_limit = plan.daily_limit;
        account.status = plan.status.to_string();
        account.warmup_started_at = Some(plan.started_at);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn account_started_days_ago(days: i64, now: DateTime<Utc>) -> Account {
        Account {
            id: Uuid::new_v4(),
            customer_id: None,
            phone_number: "+15550000001".to_string(),
            session_name: "acct_1".to_string(),
            api_id: 12345,
            api_hash: "hash".to_string(),
            status: "warming".to_string(),
            daily_message_limit: 5,
            warmup_stage: 1,
            warmup_started_at: Some(now - Duration::days(days)),
            last_used_at: None,
            created_at: now - Duration::days(days),
        }
    }

    #[test]
    fn first_application_starts_stage_one() {
        let controller = WarmupController::default();
        let now = Utc::now();
        let mut account = account_started_days_ago(0, now);
        account.warmup_started_at = None;

        let plan = controller.plan(&account, now);
        assert_eq!(plan.stage, 1);
        assert_eq!(plan.status, AccountStatus::Warming);
        assert!((5..=8).contains(&plan.daily_limit));
        assert_eq!(plan.started_at, now);
    }

    #[test]
    fn stage_tracks_days_elapsed() {
        let controller = WarmupController::default();
        let now = Utc::now();

        for (days, expected_stage) in [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (30, 5)] {
            let account = account_started_days_ago(days, now);
            let plan = controller.plan(&account, now);
            assert_eq!(plan.stage, expected_stage, "day {}", days);
        }
    }

    #[test]
    fn stage_ranges_are_strictly_increasing() {
        let controller = WarmupController::default();
        let now = Utc::now();

        // Any stage-n draw is below any stage-(n+1) draw: the ranges are disjoint
        let mut previous_high = 0;
        for days in 0..4 {
            let account = account_started_days_ago(days, now);
            let plan = controller.plan(&account, now);
            let (low, high) = STAGE_RANGES[days as usize];
            assert!((low..=high).contains(&plan.daily_limit));
            assert!(low > previous_high);
            previous_high = high;
        }
    }

    #[test]
    fn stage_five_goes_active_at_steady_limit() {
        let controller = WarmupController::new(45);
        let now = Utc::now();
        let account = account_started_days_ago(4, now);

        let plan = controller.plan(&account, now);
        assert_eq!(plan.stage, 5);
        assert_eq!(plan.daily_limit, 45);
        assert_eq!(plan.status, AccountStatus::Active);
    }

    #[test]
    fn completed_warmup_never_reverts() {
        let now = Utc::now();
        let mut account = account_started_days_ago(10, now);
        account.warmup_stage = 5;
        account.status = "active".to_string();
        account.daily_message_limit = 45;

        assert!(account.warmup_done());
    }
}
