//! CoreDNS redis plugin zone store.
//!
//! Every zone (optionally below a prefix) is a hash named after the zone with
//! a trailing dot. Each field is a lowercase subdomain holding a JSON map of
//! record type to record values, e.g. `{"cname": [{"host": "target.ca."}]}`.

use super::store::HashStore;
use crate::error::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Record type key for CNAME records.
const CNAME: &str = "cname";

type RecordMap = BTreeMap<String, Vec<Value>>;

/// Zone store backend for one zone.
#[derive(Debug, Clone)]
pub struct ZoneStoreBackend {
    zone: String,
    store: Arc<dyn HashStore>,
}

impl ZoneStoreBackend {
    /// Create a backend for `zone` on top of a shared hash store.
    pub fn new(zone: &str, store: Arc<dyn HashStore>) -> Self {
        Self {
            zone: zone.trim().to_string(),
            store,
        }
    }

    /// Register a CNAME record `subdomain[.prefix].zone -> target`.
    pub async fn create_cname(&self, subdomain: &str, prefix: &str, target: &str) -> Result<()> {
        self.create(subdomain, prefix, CNAME, vec![json!({ "host": target })])
            .await
    }

    /// Remove all CNAME records of `subdomain[.prefix].zone`.
    pub async fn delete_cname(&self, subdomain: &str, prefix: &str) -> Result<()> {
        self.delete(subdomain, prefix, CNAME).await
    }

    /// Merge `records` into the stored records of that type.
    ///
    /// New records come first, followed by previously stored ones that are
    /// not equal to any of them.
    pub async fn create(
        &self,
        subdomain: &str,
        prefix: &str,
        record_type: &str,
        mut records: Vec<Value>,
    ) -> Result<()> {
        let key = self.hash_key(prefix);
        let field = subdomain.to_lowercase();
        let mut data = self.read_records(&key, &field).await?;

        if let Some(existing) = data.remove(record_type) {
            for record in existing {
                if !records.contains(&record) {
                    records.push(record);
                }
            }
        }

        data.insert(record_type.to_string(), records);
        debug!(zone = %key, subdomain = %field, record_type, "Writing zone store records");
        self.store
            .hset(&key, &field, &serde_json::to_string(&data)?)
            .await
    }

    /// Drop every record of `record_type` for the subdomain.
    pub async fn delete(&self, subdomain: &str, prefix: &str, record_type: &str) -> Result<()> {
        let key = self.hash_key(prefix);
        let field = subdomain.to_lowercase();
        let mut data = self.read_records(&key, &field).await?;

        if data.remove(record_type).is_none() {
            return Ok(());
        }

        debug!(zone = %key, subdomain = %field, record_type, "Removing zone store records");
        if data.is_empty() {
            self.store.hdel(&key, &field).await
        } else {
            self.store
                .hset(&key, &field, &serde_json::to_string(&data)?)
                .await
        }
    }

    /// Hash name for the zone below `prefix`: `prefix.zone.`, lowercase.
    fn hash_key(&self, prefix: &str) -> String {
        let mut key = if prefix.is_empty() {
            self.zone.clone()
        } else {
            format!("{prefix}.{}", self.zone)
        };
        if !key.ends_with('.') {
            key.push('.');
        }
        key.to_lowercase()
    }

    async fn read_records(&self, key: &str, field: &str) -> Result<RecordMap> {
        match self.store.hget(key, field).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(RecordMap::new()),
        }
    }
}
