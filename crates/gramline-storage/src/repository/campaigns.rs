//! Campaign repository

use gramline_common::types::{CampaignStatus, CustomerId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Account, Campaign, CreateCampaign, Group, UpdateCampaign};

/// Campaign repository
#[derive(Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    /// Create a new campaign repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new campaign (starts in draft)
    pub async fn create(&self, input: CreateCampaign) -> Result<Campaign, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, customer_id, name, message_template, interval_minutes,
                start_at, end_at, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.customer_id)
        .bind(&input.name)
        .bind(&input.message_template)
        .bind(input.interval_minutes)
        .bind(input.start_at)
        .bind(input.end_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a campaign by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List campaigns, optionally filtered by status
    pub async fn list(
        &self,
        status: Option<CampaignStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        if let Some(status) = status {
            sqlx::query_as::<_, Campaign>(
                r#"
                SELECT * FROM campaigns
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Campaign>(
                "SELECT * FROM campaigns ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        }
    }

    /// All active campaigns, for the scheduler's due scan
    pub async fn list_active(&self) -> Result<Vec<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE status = 'active' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// A customer's active campaigns, oldest first (selector fairness order)
    pub async fn list_active_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE customer_id = $1 AND status = 'active'
            ORDER BY created_at ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Update a campaign's mutable fields
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCampaign,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                name = COALESCE($2, name),
                message_template = COALESCE($3, message_template),
                interval_minutes = COALESCE($4, interval_minutes),
                start_at = COALESCE($5, start_at),
                end_at = COALESCE($6, end_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.message_template)
        .bind(input.interval_minutes)
        .bind(input.start_at)
        .bind(input.end_at)
        .fetch_optional(&self.pool)
        .await
    }

    /// Update campaign status
    pub async fn update_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a draft campaign
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND status = 'draft'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count campaigns, optionally filtered by status
    pub async fn count(&self, status: Option<CampaignStatus>) -> Result<i64, sqlx::Error> {
        let count: (i64,) = if let Some(status) = status {
            sqlx::query_as("SELECT COUNT(*) FROM campaigns WHERE status = $1")
                .bind(status.to_string())
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT COUNT(*) FROM campaigns")
                .fetch_one(&self.pool)
                .await?
        };
        Ok(count.0)
    }

    /// Attach a target group to a campaign
    pub async fn attach_group(&self, campaign_id: Uuid, group_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO campaign_groups (campaign_id, group_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(campaign_id)
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Detach a target group from a campaign
    pub async fn detach_group(&self, campaign_id: Uuid, group_id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM campaign_groups WHERE campaign_id = $1 AND group_id = $2")
                .bind(campaign_id)
                .bind(group_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The campaign's target groups, in association order
    pub async fn groups(&self, campaign_id: Uuid) -> Result<Vec<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT g.* FROM groups g
            JOIN campaign_groups cg ON cg.group_id = g.id
            WHERE cg.campaign_id = $1 AND g.is_active
            ORDER BY cg.attached_at ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Attach an account to a campaign
    pub async fn attach_account(
        &self,
        campaign_id: Uuid,
        account_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO campaign_accounts (campaign_id, account_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(campaign_id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Detach an account from a campaign
    pub async fn detach_account(
        &self,
        campaign_id: Uuid,
        account_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM campaign_accounts WHERE campaign_id = $1 AND account_id = $2")
                .bind(campaign_id)
                .bind(account_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The campaign's attached accounts
    pub async fn accounts(&self, campaign_id: Uuid) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT a.* FROM accounts a
            JOIN campaign_accounts ca ON ca.account_id = a.id
            WHERE ca.campaign_id = $1
            ORDER BY a.last_used_at ASC NULLS FIRST
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
    }
}
