//! Hash stores backing the zone store.

use crate::error::Result;
use crate::options::ZoneStoreOptions;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Minimal hash operations the zone store needs.
///
/// Keys are zone names (`test.example.com.`), fields are subdomains, values
/// are JSON record maps.
#[async_trait]
pub trait HashStore: Send + Sync + Debug {
    /// Read a field, `None` if absent.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Write a field.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Remove a field. Removing an absent field is not an error.
    async fn hdel(&self, key: &str, field: &str) -> Result<()>;
}

/// Redis-backed hash store, as read by the CoreDNS redis plugin.
#[derive(Clone)]
pub struct RedisHashStore {
    connection: ConnectionManager,
}

impl Debug for RedisHashStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisHashStore").finish_non_exhaustive()
    }
}

impl RedisHashStore {
    /// Connect to redis with the zone store options.
    pub async fn connect(options: &ZoneStoreOptions) -> Result<Self> {
        let url = options.connection_url()?;
        let client = redis::Client::open(url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        debug!(host = %options.host, port = options.port, "Zone store connected");
        Ok(Self { connection })
    }
}

#[async_trait]
impl HashStore for RedisHashStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.hget::<_, _, Option<String>>(key, field).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.hdel::<_, _, ()>(key, field).await?;
        Ok(())
    }
}

/// In-process hash store.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryHashStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields stored under `key`.
    pub fn field_count(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, HashMap::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, String>>> {
        self.hashes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HashStore for MemoryHashStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).and_then(|hash| hash.get(field)).cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.lock()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut hashes = self.lock();
        if let Some(hash) = hashes.get_mut(key) {
            hash.remove(field);
            if hash.is_empty() {
                hashes.remove(key);
            }
        }
        Ok(())
    }
}
