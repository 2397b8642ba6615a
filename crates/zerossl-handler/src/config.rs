//! Handler configuration.
//!
//! ```toml
//! [ca]
//! access_key = "..."
//! cert_validity_days = 90
//!
//! [domains]
//! "grid.tf" = "test, test.devnet"
//! "3bot.tf" = { prefixes = "test", backend = "namecom" }
//!
//! [coredns]
//! host = "localhost"
//! port = 6379
//!
//! [namecom]
//! username = "..."
//! token = "..."
//!
//! # prefetch cache shared through redis, in-process when absent
//! [redis]
//! host = "localhost"
//! port = 6379
//! ```

use crate::cache::{CacheStore, MemoryCacheStore, PrefetchCache, RedisCacheStore};
use crate::error::{HandlerError, Result};
use crate::policy::{
    EnrollmentPolicy, DEFAULT_POLL_DELAY, DEFAULT_POLL_TIMEOUT, DEFAULT_VALIDITY_DAYS,
    DEFAULT_VERIFY_TRIALS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use zerossl_dns::{BackendKind, DnsOptions, Domain, NameComOptions, ZoneStoreOptions};

/// Prefetch cache lifetime (10 hours).
const DEFAULT_CACHE_TTL_SECS: u64 = 10 * 60 * 60;

/// Complete handler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Certificate authority account.
    pub ca: CaConfig,

    /// Zones keyed by name.
    pub domains: BTreeMap<String, DomainEntry>,

    /// Zone store (CoreDNS redis plugin) backend.
    #[serde(default)]
    pub coredns: Option<ZoneStoreOptions>,

    /// name.com backend.
    #[serde(default)]
    pub namecom: Option<NameComOptions>,

    /// Enrollment bounds.
    #[serde(default)]
    pub enrollment: EnrollmentConfig,

    /// Prefetch cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Redis server holding the prefetch cache.
    #[serde(default)]
    pub redis: Option<ZoneStoreOptions>,
}

/// `[ca]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaConfig {
    /// ZeroSSL API access key.
    pub access_key: String,

    /// Requested certificate validity (default: 90).
    #[serde(default = "default_validity_days")]
    pub cert_validity_days: u32,

    /// Override the API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// A `[domains]` entry: either the comma-separated prefixes, or a table
/// that also pins the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainEntry {
    /// `"zone" = "p1, p2"`
    Prefixes(String),
    /// `"zone" = { prefixes = "p1, p2", backend = "namecom" }`
    Detailed {
        #[serde(default)]
        prefixes: String,
        #[serde(default)]
        backend: Option<BackendKind>,
    },
}

impl DomainEntry {
    fn prefixes(&self) -> impl Iterator<Item = &str> {
        let raw = match self {
            Self::Prefixes(raw) | Self::Detailed { prefixes: raw, .. } => raw,
        };
        raw.split(',').map(str::trim).filter(|p| !p.is_empty())
    }

    const fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::Prefixes(_) => None,
            Self::Detailed { backend, .. } => *backend,
        }
    }
}

/// `[enrollment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentConfig {
    /// Verification attempts (default: 6).
    #[serde(default = "default_verify_trials")]
    pub verify_trials: u32,

    /// Delay between status polls in milliseconds (default: 200).
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// Polling timeout in seconds (default: 180).
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            verify_trials: default_verify_trials(),
            poll_delay_ms: default_poll_delay_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds (default: 36000).
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl HandlerConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HandlerError::Config(e.message().to_string()))
    }

    /// Configured zones with their allowed prefixes.
    pub fn zones(&self) -> Vec<Domain> {
        self.domains
            .iter()
            .map(|(name, entry)| {
                let zone = Domain::new(name, entry.prefixes());
                match entry.backend() {
                    Some(kind) => zone.with_backend(kind),
                    None => zone,
                }
            })
            .collect()
    }

    /// Options of the configured DNS backends.
    pub fn dns_options(&self) -> DnsOptions {
        DnsOptions {
            coredns: self.coredns.clone(),
            namecom: self.namecom.clone(),
        }
    }

    /// Enrollment bounds.
    pub const fn policy(&self) -> EnrollmentPolicy {
        EnrollmentPolicy {
            verify_trials: self.enrollment.verify_trials,
            poll_delay: Duration::from_millis(self.enrollment.poll_delay_ms),
            poll_timeout: Duration::from_secs(self.enrollment.poll_timeout_secs),
            validity_days: self.ca.cert_validity_days,
        }
    }

    /// Prefetch cache lifetime.
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Prefetch cache on redis when `[redis]` is set, in-process otherwise.
    pub fn prefetch_cache(&self) -> PrefetchCache {
        let store: Arc<dyn CacheStore> = match &self.redis {
            Some(options) => Arc::new(RedisCacheStore::new(options.clone())),
            None => Arc::new(MemoryCacheStore::new()),
        };
        PrefetchCache::with_store(self.cache_ttl(), store)
    }
}

// Default value functions for serde.
const fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

const fn default_verify_trials() -> u32 {
    DEFAULT_VERIFY_TRIALS
}

#[allow(clippy::cast_possible_truncation)]
const fn default_poll_delay_ms() -> u64 {
    DEFAULT_POLL_DELAY.as_millis() as u64
}

const fn default_poll_timeout_secs() -> u64 {
    DEFAULT_POLL_TIMEOUT.as_secs()
}

const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
