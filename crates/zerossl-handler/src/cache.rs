//! Prefetch cache of issued bundles keyed by domain set.

use crate::error::{HandlerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as TimeDelta, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;
use zerossl_dns::{DnsError, ZoneStoreOptions};

/// Namespace of prefetch entries in a shared store.
const CACHE_KEY_PREFIX: &str = "zerossl:prefetch:";

/// Canonical cache key: sorted, deduplicated, lowercase domain names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainSet(Vec<String>);

impl DomainSet {
    /// Build the canonical set of `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_ascii_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();
        Self(names)
    }

    /// Names in sorted order.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Returns true if the set holds no name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DomainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A previously issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCertificate {
    /// PEM full chain.
    pub bundle: String,
    /// Base64 DER of the leaf certificate.
    pub raw: String,
}

/// Key-value storage behind the prefetch cache.
///
/// Values are JSON encoded [`CachedCertificate`]s; entries disappear on
/// their own once `ttl` has passed.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Read a value, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires after `ttl`, replacing any previous one.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process cache store.
#[derive(Debug)]
pub struct MemoryCacheStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheStore {
    /// Create an empty store on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at.map_or(true, |at| now < at) {
            return Ok(Some(entry.value.clone()));
        }

        debug!(key = %key, "Evicting expired prefetch entry");
        entries.remove(key);
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = self.clock.now().checked_add_signed(ttl);
        self.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}

/// Redis cache store, shared by every handler pointed at the same server.
///
/// The connection is opened on first use.
pub struct RedisCacheStore {
    options: ZoneStoreOptions,
    connection: OnceCell<ConnectionManager>,
}

impl fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("host", &self.options.host)
            .field("port", &self.options.port)
            .finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    /// Create a store for the redis server at `options`.
    pub fn new(options: ZoneStoreOptions) -> Self {
        Self {
            options,
            connection: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let url = self.options.connection_url().map_err(|e| match e {
                    DnsError::Store(message) => HandlerError::Cache(message),
                    other => other.into(),
                })?;
                let client = redis::Client::open(url.as_str())?;
                let connection = ConnectionManager::new(client).await?;
                debug!(host = %self.options.host, port = self.options.port, "Cache store connected");
                Ok::<_, HandlerError>(connection)
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }
}

/// TTL cache of issued certificates keyed by domain set.
#[derive(Debug, Clone)]
pub struct PrefetchCache {
    ttl: Duration,
    store: Arc<dyn CacheStore>,
}

impl PrefetchCache {
    /// Create an in-process cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self::with_store(ttl, Arc::new(MemoryCacheStore::new()))
    }

    /// Create a cache on top of `store`.
    pub fn with_store(ttl: Duration, store: Arc<dyn CacheStore>) -> Self {
        Self { ttl, store }
    }

    /// Entry lifetime.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached certificate for `domains`, `None` when absent or expired.
    pub async fn get(&self, domains: &DomainSet) -> Result<Option<CachedCertificate>> {
        let Some(value) = self.store.get(&cache_key(domains)).await? else {
            return Ok(None);
        };
        let certificate = serde_json::from_str(&value)
            .map_err(|e| HandlerError::Cache(format!("malformed entry for {domains}: {e}")))?;
        Ok(Some(certificate))
    }

    /// Store `certificate` for `domains`, replacing any previous entry.
    pub async fn insert(&self, domains: &DomainSet, certificate: &CachedCertificate) -> Result<()> {
        let value =
            serde_json::to_string(certificate).map_err(|e| HandlerError::Cache(e.to_string()))?;
        debug!(domains = %domains, ttl_secs = self.ttl.as_secs(), "Caching issued certificate");
        self.store.set_ex(&cache_key(domains), &value, self.ttl).await
    }
}

/// Store key of a domain set.
fn cache_key(domains: &DomainSet) -> String {
    format!("{CACHE_KEY_PREFIX}{domains}")
}
