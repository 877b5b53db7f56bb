//! Message log repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CreateMessageLog, MessageLog};

/// Message log repository
#[derive(Clone)]
pub struct MessageLogRepository {
    pool: PgPool,
}

impl MessageLogRepository {
    /// Create a new message log repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one send-attempt record
    pub async fn append(&self, input: CreateMessageLog) -> Result<MessageLog, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, MessageLog>(
            r#"
            INSERT INTO message_logs (
                id, campaign_id, account_id, group_id, target, message_text,
                status, error_code, flood_wait_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.campaign_id)
        .bind(input.account_id)
        .bind(input.group_id)
        .bind(&input.target)
        .bind(&input.message_text)
        .bind(&input.status)
        .bind(&input.error_code)
        .bind(input.flood_wait_seconds)
        .fetch_one(&self.pool)
        .await
    }

    /// The campaign's last successful send, for interval due-checks
    pub async fn last_sent_at(
        &self,
        campaign_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT sent_at FROM message_logs
            WHERE campaign_id = $1 AND status = 'sent'
            ORDER BY sent_at DESC
            LIMIT 1
            "#,
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(at,)| at))
    }

    /// List log entries, optionally filtered by campaign and/or account
    pub async fn list(
        &self,
        campaign_id: Option<Uuid>,
        account_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageLog>, sqlx::Error> {
        sqlx::query_as::<_, MessageLog>(
            r#"
            SELECT * FROM message_logs
            WHERE ($1::uuid IS NULL OR campaign_id = $1)
              AND ($2::uuid IS NULL OR account_id = $2)
            ORDER BY sent_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(campaign_id)
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Count log entries under the same filters as `list`
    pub async fn count(
        &self,
        campaign_id: Option<Uuid>,
        account_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM message_logs
            WHERE ($1::uuid IS NULL OR campaign_id = $1)
              AND ($2::uuid IS NULL OR account_id = $2)
            "#,
        )
        .bind(campaign_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}
