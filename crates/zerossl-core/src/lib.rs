//! Core types for the ZeroSSL certificate API.
//!
//! This crate holds the wire vocabulary shared by the REST client and the
//! enrollment handler:
//!
//! - **Types**: certificate records, the status vocabulary, challenge types,
//!   verification outcomes and download payloads
//! - **Errors**: transport and API failures as [`ZeroSslError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use zerossl_core::{Certificate, CertificateStatus};
//!
//! fn needs_dns(cert: &Certificate) -> bool {
//!     cert.status.needs_validation() && !cert.domain_validations().is_empty()
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/zerossl-core/0.3.0")]

mod error;
pub mod types;

pub use error::{Result, ZeroSslError};
pub use types::*;
