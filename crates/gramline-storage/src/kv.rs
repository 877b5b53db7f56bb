//! Ephemeral counter store abstraction
//!
//! Locks, daily counters, cooldown markers, and health markers live here.
//! Everything behind this trait is short-lived derived state that can be
//! reconstructed from the database; it is never authoritative for history.
//! Only atomic single-key operations are exposed, so correctness does not
//! depend on store-side transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gramline_common::{Error, Result};
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

/// Key-value store with per-key expiry and atomic increment
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key; `ttl` of None means no expiry
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Write a key only if absent; returns true when this write won
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Atomically increment a counter by one, returning the new value
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Re-arm a key's expiry to an absolute point in time
    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<()>;

    /// Check whether a key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete a key
    async fn del(&self, key: &str) -> Result<()>;
}

fn store_err(e: redis::RedisError) -> Error {
    Error::CounterStore(e.to_string())
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    /// Connect to Redis and build a multiplexed connection manager
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let conn = client.get_connection_manager().await.map_err(store_err)?;

        info!("Connected to Redis");

        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        cmd.query_async::<()>(&mut conn).await.map_err(store_err)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(reply.is_some())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        redis::cmd("INCR")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("EXPIREAT")
            .arg(key)
            .arg(at.timestamp())
            .query_async::<()>(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(store_err)
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// In-memory store for tests and single-node development
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_live(
        entries: &mut HashMap<String, MemoryEntry>,
        key: &str,
    ) -> Option<String> {
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        Ok(Self::read_live(&mut entries, key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        if Self::read_live(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        let current = Self::read_live(&mut entries, key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        let expires_at = entries.get(key).and_then(|e| e.expires_at);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        let remaining = (at - Utc::now()).num_seconds();
        if remaining <= 0 {
            entries.remove(key);
            return Ok(());
        }
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(remaining as u64));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        Ok(Self::read_live(&mut entries, key).is_some())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_kv_set_get_del() {
        let kv = MemoryKv::new();
        kv.set("k", "v", None).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));
        assert!(kv.exists("k").await.unwrap());
        kv.del("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_kv_incr_counts_up() {
        let kv = MemoryKv::new();
        assert_eq!(kv.incr("n").await.unwrap(), 1);
        assert_eq!(kv.incr("n").await.unwrap(), 2);
        assert_eq!(kv.incr("n").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn memory_kv_set_nx_wins_once() {
        let kv = MemoryKv::new();
        assert!(kv.set_nx("lock", "a", Duration::from_secs(60)).await.unwrap());
        assert!(!kv.set_nx("lock", "b", Duration::from_secs(60)).await.unwrap());
        assert_eq!(kv.get("lock").await.unwrap(), Some("a".to_string()));
    }

    #[tokio::test]
    async fn memory_kv_expired_key_is_gone() {
        let kv = MemoryKv::new();
        kv.set("k", "v", Some(Duration::from_millis(5))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(!kv.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn memory_kv_expire_at_past_removes() {
        let kv = MemoryKv::new();
        kv.set("k", "v", None).await.unwrap();
        kv.expire_at("k", Utc::now() - chrono::Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }
}
