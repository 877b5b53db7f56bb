//! Configuration for Gramline

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis (ephemeral counter store) configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// API configuration
    pub api: ApiConfig,

    /// Campaign scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Send worker configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Default rate limits and health thresholds
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Account warmup configuration
    #[serde(default)]
    pub warmup: WarmupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
        }
    }
}

fn default_hostname() -> String {
    "localhost".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (PostgreSQL)
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Redis configuration for locks, counters, and cooldown markers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    #[serde(default = "default_api_bind")]
    pub bind: String,

    /// Static API key for the administrative surface
    pub api_key: String,
}

fn default_api_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Campaign scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Polling interval between scheduler ticks (seconds)
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Time-to-live for per-campaign processing locks (seconds)
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            lock_ttl_secs: default_lock_ttl_secs(),
        }
    }
}

fn default_tick_secs() -> u64 {
    30
}

fn default_lock_ttl_secs() -> u64 {
    120
}

/// Send worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Sleep when no target is eligible (seconds)
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,

    /// Lower bound of the randomized post-send delay (seconds)
    #[serde(default = "default_min_send_delay_secs")]
    pub min_send_delay_secs: u64,

    /// Upper bound of the randomized post-send delay (seconds)
    #[serde(default = "default_max_send_delay_secs")]
    pub max_send_delay_secs: u64,

    /// Fixed backoff after protocol-level transport faults (seconds)
    #[serde(default = "default_protocol_backoff_secs")]
    pub protocol_backoff_secs: u64,

    /// Cap on how long a worker waits out a group cooldown in one sleep (seconds)
    #[serde(default = "default_cooldown_wait_cap_secs")]
    pub cooldown_wait_cap_secs: u64,

    /// How often the supervisor rescans for new sendable accounts (seconds)
    #[serde(default = "default_rescan_secs")]
    pub rescan_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_secs: default_idle_secs(),
            min_send_delay_secs: default_min_send_delay_secs(),
            max_send_delay_secs: default_max_send_delay_secs(),
            protocol_backoff_secs: default_protocol_backoff_secs(),
            cooldown_wait_cap_secs: default_cooldown_wait_cap_secs(),
            rescan_secs: default_rescan_secs(),
        }
    }
}

fn default_idle_secs() -> u64 {
    60
}

fn default_min_send_delay_secs() -> u64 {
    45
}

fn default_max_send_delay_secs() -> u64 {
    120
}

fn default_protocol_backoff_secs() -> u64 {
    300
}

fn default_cooldown_wait_cap_secs() -> u64 {
    300
}

fn default_rescan_secs() -> u64 {
    60
}

/// Default rate limits and health thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Fallback daily send allowance when no plan/warmup value applies
    #[serde(default = "default_account_daily_limit")]
    pub account_daily_limit: i64,

    /// Default per-group cooldown (minutes)
    #[serde(default = "default_group_cooldown_minutes")]
    pub group_cooldown_minutes: i64,

    /// Rate-control signals within the window before an account is paused
    #[serde(default = "default_flood_threshold")]
    pub flood_threshold: i64,

    /// Rolling flood-counter window (minutes)
    #[serde(default = "default_flood_window_minutes")]
    pub flood_window_minutes: i64,

    /// Pause duration after the flood threshold is hit (minutes)
    #[serde(default = "default_pause_minutes")]
    pub pause_minutes: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            account_daily_limit: default_account_daily_limit(),
            group_cooldown_minutes: default_group_cooldown_minutes(),
            flood_threshold: default_flood_threshold(),
            flood_window_minutes: default_flood_window_minutes(),
            pause_minutes: default_pause_minutes(),
        }
    }
}

fn default_account_daily_limit() -> i64 {
    40
}

fn default_group_cooldown_minutes() -> i64 {
    1440
}

fn default_flood_threshold() -> i64 {
    3
}

fn default_flood_window_minutes() -> i64 {
    60
}

fn default_pause_minutes() -> i64 {
    120
}

/// Account warmup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmupConfig {
    /// Steady-state daily limit once warmup completes
    #[serde(default = "default_steady_daily_limit")]
    pub steady_daily_limit: i64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            steady_daily_limit: default_steady_daily_limit(),
        }
    }
}

fn default_steady_daily_limit() -> i64 {
    45
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Env-filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info,gramline=debug".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/gramline/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_sections() {
        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.tick_secs, 30);
        assert_eq!(scheduler.lock_ttl_secs, 120);

        let limits = LimitsConfig::default();
        assert_eq!(limits.group_cooldown_minutes, 1440);
        assert_eq!(limits.flood_threshold, 3);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
hostname = "gramline.example.com"

[database]
url = "postgres://localhost/gramline"

[redis]
url = "redis://redis:6379/1"

[api]
bind = "127.0.0.1:9090"
api_key = "gl_test_key"

[worker]
min_send_delay_secs = 20
max_send_delay_secs = 60
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.hostname, "gramline.example.com");
        assert_eq!(config.redis.url, "redis://redis:6379/1");
        assert_eq!(config.api.api_key, "gl_test_key");
        assert_eq!(config.worker.min_send_delay_secs, 20);
        assert_eq!(config.scheduler.tick_secs, 30);
    }
}
