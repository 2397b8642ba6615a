//! Zone-aware DNS client for CNAME domain validation.
//!
//! A [`DnsClient`] owns the configured zones ([`Domain`]), decomposes a
//! fully-qualified host into `(subdomain, prefix, zone)`, enforces each
//! zone's prefix allow-list, and dispatches record changes to one backend
//! instance per zone:
//!
//! - **Zone store**: CoreDNS redis plugin layout, one hash per zone
//! - **name.com**: hosted provider REST API
//!
//! # Example
//!
//! ```rust,ignore
//! use zerossl_dns::{DnsClient, DnsOptions, Domain, CnameProvisioner};
//!
//! let zones = vec![Domain::new("example.com", ["test"])];
//! let dns = DnsClient::new(zones, DnsOptions::default().with_coredns(Default::default()))?;
//!
//! dns.create_cname("_a1.test.example.com", "b2.c3.ca.invalid").await?;
//! dns.delete_cname("_a1.test.example.com").await?;
//! ```

#![doc(html_root_url = "https://docs.rs/zerossl-dns/0.3.0")]

pub mod backend;
mod client;
mod error;
mod options;
mod zone;

pub use backend::{Backend, HashStore, MemoryHashStore, NameComBackend, RedisHashStore, ZoneStoreBackend};
pub use client::{CnameProvisioner, DnsClient};
pub use error::{DnsError, Result};
pub use options::{BackendKind, DnsOptions, NameComOptions, ZoneStoreOptions};
pub use zone::{Domain, HostParts};
