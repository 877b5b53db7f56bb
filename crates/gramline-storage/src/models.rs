//! Database models for Gramline

use chrono::{DateTime, NaiveDate, Utc};
use gramline_common::types::{AccountStatus, CampaignStatus, CustomerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer owning campaigns and accounts
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// Pricing plan name, resolved through gramline_common::plans
    pub plan: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a customer
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomer {
    pub name: String,
    pub email: Option<String>,
    pub plan: String,
}

/// Bulk-messaging campaign
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub customer_id: CustomerId,
    pub name: String,
    pub message_template: String,
    pub interval_minutes: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }
}

/// Input for creating a campaign
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaign {
    pub customer_id: CustomerId,
    pub name: String,
    pub message_template: String,
    pub interval_minutes: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Input for updating a campaign
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCampaign {
    pub name: Option<String>,
    pub message_template: Option<String>,
    pub interval_minutes: Option<i32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Messaging account operated against the chat network
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub customer_id: Option<CustomerId>,
    pub phone_number: String,
    pub session_name: String,
    pub api_id: i32,
    pub api_hash: String,
    pub status: String,
    pub daily_message_limit: i32,
    pub warmup_stage: i32,
    pub warmup_started_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Get status enum
    pub fn status_enum(&self) -> Option<AccountStatus> {
        self.status.parse().ok()
    }

    /// Whether warmup has completed for this account
    pub fn warmup_done(&self) -> bool {
        self.warmup_stage >= 5 && self.status == AccountStatus::Active.to_string()
    }
}

/// Input for creating an account
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccount {
    pub customer_id: Option<CustomerId>,
    pub phone_number: String,
    pub session_name: String,
    pub api_id: i32,
    pub api_hash: String,
}

/// Target group or channel on the chat network
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub chat_id: Option<i64>,
    pub username: Option<String>,
    pub title: Option<String>,
    pub allow_ads: bool,
    pub cooldown_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Identifier handed to the transport: @username preferred, chat id otherwise
    pub fn target_identifier(&self) -> Option<String> {
        self.username
            .clone()
            .or_else(|| self.chat_id.map(|id| id.to_string()))
    }
}

/// Input for creating a group
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroup {
    pub chat_id: Option<i64>,
    pub username: Option<String>,
    pub title: Option<String>,
    pub allow_ads: Option<bool>,
    pub cooldown_minutes: Option<i32>,
}

/// Append-only record of one send attempt
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub target: String,
    pub message_text: Option<String>,
    pub status: String,
    pub error_code: Option<String>,
    pub flood_wait_seconds: Option<i32>,
    pub sent_at: DateTime<Utc>,
}

/// Input for appending a message log entry
#[derive(Debug, Clone)]
pub struct CreateMessageLog {
    pub campaign_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub target: String,
    pub message_text: Option<String>,
    pub status: String,
    pub error_code: Option<String>,
    pub flood_wait_seconds: Option<i32>,
}

/// Append-only abuse-signal record
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct HealthEvent {
    pub id: Uuid,
    pub account_id: Uuid,
    pub event_type: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row per (account, calendar day) of recorded sends
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DailyUsage {
    pub id: Uuid,
    pub account_id: Uuid,
    pub usage_date: NaiveDate,
    pub messages_sent: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
