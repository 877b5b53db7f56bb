//! Gramline Core - Campaign orchestration engine
//!
//! This crate provides the orchestration engine for Gramline: the transport
//! contract, rate limiting, account health tracking, warmup ramping, message
//! humanization, target selection, and the scheduler/worker loops that tie
//! them together.

pub mod campaigns;
pub mod dispatch;
pub mod health;
pub mod limiter;
pub mod transport;
pub mod variator;
pub mod warmup;
pub mod worker;

pub use campaigns::{campaign_is_due, CampaignExecutor, CampaignScheduler, CampaignTarget, TargetSelector};
pub use dispatch::{MessageDispatcher, SendDisposition};
pub use health::{AccountHealthMonitor, HealthReport};
pub use limiter::{RateLimitResult, RateLimiter};
pub use transport::{AccountCredentials, ChatClient, ClientFactory, ConnectOutcome, SendOutcome};
pub use variator::MessageVariator;
pub use warmup::{WarmupController, WarmupPlan};
pub use worker::{SendWorker, WorkerSupervisor};
