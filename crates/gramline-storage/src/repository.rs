//! Repository layer for data access

pub mod accounts;
pub mod campaigns;
pub mod customers;
pub mod groups;
pub mod health_events;
pub mod message_logs;
pub mod usage;

pub use accounts::AccountRepository;
pub use campaigns::CampaignRepository;
pub use customers::CustomerRepository;
pub use groups::GroupRepository;
pub use health_events::HealthEventRepository;
pub use message_logs::MessageLogRepository;
pub use usage::DailyUsageRepository;
