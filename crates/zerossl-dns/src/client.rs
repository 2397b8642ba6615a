//! DNS client router.

use crate::backend::{Backend, HashStore, NameComBackend, RedisHashStore, ZoneStoreBackend};
use crate::error::{DnsError, Result};
use crate::options::{BackendKind, DnsOptions};
use crate::zone::{self, Domain, HostParts};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Provisioning of CNAME validation records for fully-qualified hosts.
#[async_trait]
pub trait CnameProvisioner: Send + Sync {
    /// Decompose `host` against the configured zones without touching any record.
    async fn verify(&self, host: &str) -> Result<HostParts>;

    /// Create a CNAME `host -> target`. Creating an existing record is not an error.
    async fn create_cname(&self, host: &str, target: &str) -> Result<()>;

    /// Delete the CNAME records of `host`. Deleting a missing record is not an error.
    async fn delete_cname(&self, host: &str) -> Result<()>;
}

/// Routes record changes to one backend per configured zone.
///
/// Backends are created on first use and kept for the life of the client.
pub struct DnsClient {
    zones: Vec<Domain>,
    options: DnsOptions,
    default_kind: BackendKind,
    store: OnceCell<Arc<dyn HashStore>>,
    backends: Mutex<HashMap<String, Arc<Backend>>>,
}

impl std::fmt::Debug for DnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsClient")
            .field("zones", &self.zones)
            .field("default_kind", &self.default_kind)
            .finish_non_exhaustive()
    }
}

impl DnsClient {
    /// Create a router over `zones`.
    ///
    /// Fails with [`DnsError::NotConfigured`] when `options` enables no backend.
    pub fn new(zones: Vec<Domain>, options: DnsOptions) -> Result<Self> {
        let default_kind = options
            .configured_kinds()
            .first()
            .copied()
            .ok_or(DnsError::NotConfigured)?;

        Ok(Self {
            zones,
            options,
            default_kind,
            store: OnceCell::new(),
            backends: Mutex::new(HashMap::new()),
        })
    }

    /// Use `store` for zone-store backends instead of connecting to redis.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn HashStore>) -> Self {
        self.store = OnceCell::new_with(Some(store));
        self
    }

    /// Configured zones.
    pub fn zones(&self) -> &[Domain] {
        &self.zones
    }

    /// Backend serving `zone`, created on first use.
    pub async fn backend_for(&self, zone: &Domain) -> Result<Arc<Backend>> {
        let mut backends = self.backends.lock().await;
        if let Some(backend) = backends.get(zone.name()) {
            return Ok(Arc::clone(backend));
        }

        let kind = zone.preferred_backend().unwrap_or(self.default_kind);
        let backend = Arc::new(self.build_backend(zone, kind).await?);
        debug!(zone = %zone, backend = %kind, "DNS backend created");

        backends.insert(zone.name().to_string(), Arc::clone(&backend));
        Ok(backend)
    }

    async fn build_backend(&self, zone: &Domain, kind: BackendKind) -> Result<Backend> {
        let missing = || DnsError::ConfigMissing {
            backend: kind.to_string(),
            zone: zone.name().to_string(),
        };

        match kind {
            BackendKind::CoreDns => {
                let options = self.options.coredns.as_ref().ok_or_else(missing)?;
                let store = self
                    .store
                    .get_or_try_init(|| async {
                        let store = RedisHashStore::connect(options).await?;
                        Ok::<_, DnsError>(Arc::new(store) as Arc<dyn HashStore>)
                    })
                    .await?;
                Ok(Backend::ZoneStore(ZoneStoreBackend::new(
                    zone.name(),
                    Arc::clone(store),
                )))
            }
            BackendKind::NameCom => {
                let options = self.options.namecom.as_ref().ok_or_else(missing)?;
                Ok(Backend::NameCom(NameComBackend::new(zone.name(), options)?))
            }
        }
    }
}

#[async_trait]
impl CnameProvisioner for DnsClient {
    async fn verify(&self, host: &str) -> Result<HostParts> {
        zone::resolve(&self.zones, host)
    }

    async fn create_cname(&self, host: &str, target: &str) -> Result<()> {
        let parts = self.verify(host).await?;
        let backend = self.backend_for(&parts.zone).await?;

        debug!(
            host = %host,
            zone = %parts.zone,
            backend = %backend.kind(),
            target = %target,
            "Creating CNAME"
        );
        backend
            .create_cname(&parts.subdomain, &parts.prefix, target)
            .await?;
        Ok(())
    }

    async fn delete_cname(&self, host: &str) -> Result<()> {
        let parts = self.verify(host).await?;
        let backend = self.backend_for(&parts.zone).await?;

        debug!(
            host = %host,
            zone = %parts.zone,
            backend = %backend.kind(),
            "Deleting CNAME"
        );
        backend.delete_cname(&parts.subdomain, &parts.prefix).await
    }
}
