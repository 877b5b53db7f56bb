//! Daily usage repository

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DailyUsage;

/// Durable (account, day) send counters
#[derive(Clone)]
pub struct DailyUsageRepository {
    pool: PgPool,
}

impl DailyUsageRepository {
    /// Create a new daily usage repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensure today's row exists and return it.
    ///
    /// Race-safe: a concurrent insert of the same (account, day) loses on the
    /// unique constraint and the row is re-read instead.
    pub async fn ensure_today(&self, account_id: Uuid) -> Result<DailyUsage, sqlx::Error> {
        let today = Utc::now().date_naive();

        sqlx::query(
            r#"
            INSERT INTO account_daily_usage (id, account_id, usage_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, usage_date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(today)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, DailyUsage>(
            "SELECT * FROM account_daily_usage WHERE account_id = $1 AND usage_date = $2",
        )
        .bind(account_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await
    }

    /// Record one confirmed send against today's row
    pub async fn increment_today(&self, account_id: Uuid) -> Result<(), sqlx::Error> {
        let today = Utc::now().date_naive();

        sqlx::query(
            r#"
            INSERT INTO account_daily_usage (id, account_id, usage_date, messages_sent)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (account_id, usage_date)
            DO UPDATE SET messages_sent = account_daily_usage.messages_sent + 1,
                          updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Read a specific day's usage
    pub async fn get(
        &self,
        account_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyUsage>, sqlx::Error> {
        sqlx::query_as::<_, DailyUsage>(
            "SELECT * FROM account_daily_usage WHERE account_id = $1 AND usage_date = $2",
        )
        .bind(account_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
    }
}
