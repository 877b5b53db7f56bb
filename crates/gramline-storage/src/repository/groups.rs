//! Group repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CreateGroup, Group};

/// Group repository
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new group repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new target group
    pub async fn create(&self, input: CreateGroup) -> Result<Group, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (id, chat_id, username, title, allow_ads, cooldown_minutes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.chat_id)
        .bind(&input.username)
        .bind(&input.title)
        .bind(input.allow_ads.unwrap_or(true))
        .bind(input.cooldown_minutes.unwrap_or(1440))
        .fetch_one(&self.pool)
        .await
    }

    /// Get a group by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List groups
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            "SELECT * FROM groups ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Delete a group
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
