//! Error types for the enrollment handler.

use thiserror::Error;
use zerossl_core::ZeroSslError;
use zerossl_dns::DnsError;

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Errors that can occur while configuring the handler or enrolling.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Configuration file is missing sections or malformed.
    #[error("config error: {0}")]
    Config(String),

    /// CSR could not be decoded or carries no names.
    #[error("invalid csr: {0}")]
    Csr(String),

    /// Issued certificate could not be decoded.
    #[error("invalid certificate: {0}")]
    Certificate(String),

    /// DNS client or zone configuration error.
    #[error(transparent)]
    Dns(#[from] DnsError),

    /// CA client error.
    #[error(transparent)]
    Ca(#[from] ZeroSslError),

    /// An enrollment ended with an error message.
    #[error("{0}")]
    Enrollment(String),

    /// Prefetch cache store failure.
    #[error("cache store error: {0}")]
    Cache(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redis::RedisError> for HandlerError {
    fn from(e: redis::RedisError) -> Self {
        Self::Cache(e.to_string())
    }
}

impl HandlerError {
    /// Configuration problems detected before contacting the CA.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        match self {
            Self::Config(_) | Self::Csr(_) => true,
            Self::Dns(e) => e.is_config_error(),
            _ => false,
        }
    }
}
