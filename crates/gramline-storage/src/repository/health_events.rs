//! Health event repository

use gramline_common::types::HealthEventType;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::HealthEvent;

/// Append-only repository for account abuse signals
#[derive(Clone)]
pub struct HealthEventRepository {
    pool: PgPool,
}

impl HealthEventRepository {
    /// Create a new health event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one signal; never mutated afterwards
    pub async fn append(
        &self,
        account_id: Uuid,
        event_type: HealthEventType,
        details: Option<&str>,
    ) -> Result<HealthEvent, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, HealthEvent>(
            r#"
            INSERT INTO account_health_events (id, account_id, event_type, details)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(account_id)
        .bind(event_type.to_string())
        .bind(details)
        .fetch_one(&self.pool)
        .await
    }

    /// An account's signal history, newest first
    pub async fn list_by_account(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<HealthEvent>, sqlx::Error> {
        sqlx::query_as::<_, HealthEvent>(
            r#"
            SELECT * FROM account_health_events
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
