//! Account repository

use chrono::{DateTime, Utc};
use gramline_common::types::{AccountStatus, CustomerId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Account, CreateAccount};

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new account (starts warming)
    pub async fn create(&self, input: CreateAccount) -> Result<Account, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (
                id, customer_id, phone_number, session_name, api_id, api_hash, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'warming')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.customer_id)
        .bind(&input.phone_number)
        .bind(&input.session_name)
        .bind(input.api_id)
        .bind(&input.api_hash)
        .fetch_one(&self.pool)
        .await
    }

    /// Get an account by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List accounts
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// All accounts eligible for a send loop (warming or active)
    pub async fn list_sendable(&self) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE status IN ('warming', 'active')
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// A customer's sendable accounts, least-recently-used first, capped by plan
    pub async fn list_sendable_by_customer(
        &self,
        customer_id: CustomerId,
        limit: i64,
    ) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE customer_id = $1 AND status IN ('warming', 'active')
            ORDER BY last_used_at ASC NULLS FIRST
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Update account status
    pub async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            "UPDATE accounts SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await
    }

    /// Persist the result of one warmup application
    pub async fn apply_warmup(
        &self,
        id: Uuid,
        stage: i32,
        daily_limit: i32,
        status: AccountStatus,
        started_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE accounts SET
                warmup_stage = $2,
                daily_message_limit = $3,
                status = $4,
                warmup_started_at = COALESCE(warmup_started_at, $5)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(stage)
        .bind(daily_limit)
        .bind(status.to_string())
        .bind(started_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Stamp the account as just used
    pub async fn touch_last_used(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete an account
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
