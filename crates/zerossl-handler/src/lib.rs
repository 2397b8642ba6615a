//! ZeroSSL certificate handler for ACME gateways.
//!
//! Turns a CSR into an issued certificate bundle: the domains are checked
//! against the configured zones, a certificate is created at ZeroSSL, one
//! CNAME validation record per domain is provisioned through
//! [`zerossl_dns`], the CA is asked to validate and polled until issuance,
//! the records are removed again and the bundle is downloaded.
//!
//! # Example
//!
//! ```rust,ignore
//! use zerossl_handler::{CaHandler, HandlerConfig, ZeroSslHandler};
//!
//! let config = HandlerConfig::load("zerossl.toml".as_ref())?;
//! let handler = ZeroSslHandler::from_config(&config)?;
//!
//! let response = handler.enroll(csr_pem.as_bytes()).await;
//! match response.error {
//!     None => println!("{}", response.bundle.unwrap_or_default()),
//!     Some(error) => eprintln!("enrollment failed: {error}"),
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/zerossl-handler/0.3.0")]

mod authority;
mod bundle;
mod cache;
mod config;
mod csr;
mod error;
mod handler;
mod lifecycle;
mod locks;
mod policy;

pub use authority::CertificateAuthority;
pub use cache::{
    CacheStore, CachedCertificate, Clock, DomainSet, MemoryCacheStore, PrefetchCache,
    RedisCacheStore, SystemClock,
};
pub use config::{CaConfig, CacheConfig, DomainEntry, EnrollmentConfig, HandlerConfig};
pub use csr::CertificateRequest;
pub use error::{HandlerError, Result};
pub use handler::{PrefetchedCertificate, ZeroSslHandler, ZeroSslHandlerBuilder};
pub use lifecycle::{
    CaHandler, EnrollResponse, PollResponse, RevokeResponse, TriggerResponse, NOT_IMPLEMENTED,
};
pub use locks::{DomainGuard, DomainLocks};
pub use policy::EnrollmentPolicy;

// Re-export the crates the handler is built from
pub use zerossl_client;
pub use zerossl_core;
pub use zerossl_dns;
