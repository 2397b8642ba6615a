//! DNS backends.
//!
//! Each configured zone is served by exactly one backend instance.

mod namecom;
mod store;
mod zone_store;

pub use namecom::NameComBackend;
pub use store::{HashStore, MemoryHashStore, RedisHashStore};
pub use zone_store::ZoneStoreBackend;

use crate::error::Result;
use crate::options::BackendKind;

/// A backend bound to one zone.
#[derive(Debug, Clone)]
pub enum Backend {
    /// CoreDNS redis plugin zone store.
    ZoneStore(ZoneStoreBackend),
    /// name.com hosted DNS.
    NameCom(NameComBackend),
}

impl Backend {
    /// Kind of this backend.
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::ZoneStore(_) => BackendKind::CoreDns,
            Self::NameCom(_) => BackendKind::NameCom,
        }
    }

    /// Create a CNAME `subdomain[.prefix].zone -> target`.
    ///
    /// Returns the provider record id when the backend assigns one.
    pub async fn create_cname(
        &self,
        subdomain: &str,
        prefix: &str,
        target: &str,
    ) -> Result<Option<String>> {
        match self {
            Self::ZoneStore(backend) => {
                backend.create_cname(subdomain, prefix, target).await?;
                Ok(None)
            }
            Self::NameCom(backend) => backend
                .create_cname(subdomain, prefix, target)
                .await
                .map(Some),
        }
    }

    /// Delete the CNAME records of `subdomain[.prefix].zone`.
    pub async fn delete_cname(&self, subdomain: &str, prefix: &str) -> Result<()> {
        match self {
            Self::ZoneStore(backend) => backend.delete_cname(subdomain, prefix).await,
            Self::NameCom(backend) => backend.delete_cname(subdomain, prefix).await,
        }
    }
}
