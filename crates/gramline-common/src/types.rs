//! Common types for Gramline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for customers
pub type CustomerId = Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for messaging accounts
pub type AccountId = Uuid;

/// Unique identifier for target groups
pub type GroupId = Uuid;

/// Unique identifier for message log entries
pub type MessageLogId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Active => write!(f, "active"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "active" => Ok(CampaignStatus::Active),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Messaging account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Warming,
    Active,
    Paused,
    Restricted,
    Banned,
}

impl AccountStatus {
    /// Whether the account may be scheduled for sending at all
    pub fn is_sendable(&self) -> bool {
        matches!(self, AccountStatus::Warming | AccountStatus::Active)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Warming => write!(f, "warming"),
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Paused => write!(f, "paused"),
            AccountStatus::Restricted => write!(f, "restricted"),
            AccountStatus::Banned => write!(f, "banned"),
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warming" => Ok(AccountStatus::Warming),
            "active" => Ok(AccountStatus::Active),
            "paused" => Ok(AccountStatus::Paused),
            "restricted" => Ok(AccountStatus::Restricted),
            "banned" => Ok(AccountStatus::Banned),
            _ => Err(format!("Invalid account status: {}", s)),
        }
    }
}

/// Durable abuse-signal categories recorded per account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthEventType {
    Floodwait,
    WriteForbidden,
    Paused,
    Banned,
}

impl std::fmt::Display for HealthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthEventType::Floodwait => write!(f, "floodwait"),
            HealthEventType::WriteForbidden => write!(f, "write_forbidden"),
            HealthEventType::Paused => write!(f, "paused"),
            HealthEventType::Banned => write!(f, "banned"),
        }
    }
}

/// Outcome classification of one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLogStatus {
    Sent,
    Failed,
    Skipped,
}

impl std::fmt::Display for MessageLogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageLogStatus::Sent => write!(f, "sent"),
            MessageLogStatus::Failed => write!(f, "failed"),
            MessageLogStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for MessageLogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(MessageLogStatus::Sent),
            "failed" => Ok(MessageLogStatus::Failed),
            "skipped" => Ok(MessageLogStatus::Skipped),
            _ => Err(format!("Invalid message log status: {}", s)),
        }
    }
}

/// Derived abuse-risk standing of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Warning,
    Paused,
    Banned,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Warning => write!(f, "warning"),
            HealthState::Paused => write!(f, "paused"),
            HealthState::Banned => write!(f, "banned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_status_roundtrip() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Active,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
        ] {
            let parsed: CampaignStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_account_status_sendable() {
        assert!(AccountStatus::Warming.is_sendable());
        assert!(AccountStatus::Active.is_sendable());
        assert!(!AccountStatus::Paused.is_sendable());
        assert!(!AccountStatus::Restricted.is_sendable());
        assert!(!AccountStatus::Banned.is_sendable());
    }

    #[test]
    fn test_health_event_type_display() {
        assert_eq!(HealthEventType::Floodwait.to_string(), "floodwait");
        assert_eq!(HealthEventType::WriteForbidden.to_string(), "write_forbidden");
    }

    #[test]
    fn test_invalid_status_rejected() {
        assert!("sending".parse::<CampaignStatus>().is_err());
        assert!("dormant".parse::<AccountStatus>().is_err());
    }
}
