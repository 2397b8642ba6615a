//! Error types for zone resolution and DNS backends.

use thiserror::Error;

/// Result type for DNS operations.
pub type Result<T> = std::result::Result<T, DnsError>;

/// Errors that can occur while resolving hosts or changing records.
#[derive(Error, Debug)]
pub enum DnsError {
    /// No DNS backend section is configured at all.
    #[error("no dns client is configured (e.g. coredns or namecom)")]
    NotConfigured,

    /// The host does not belong to any configured zone.
    #[error("main/parent domain of '{host}' is not configured")]
    ZoneNotConfigured { host: String },

    /// The host's prefix is not in the zone's allow-list.
    #[error("'{prefix}' prefix is not allowed in '{zone}' configuration")]
    PrefixNotAllowed { prefix: String, zone: String },

    /// The backend selected for a zone has no options.
    #[error("{backend} is selected for zone '{zone}' but not configured")]
    ConfigMissing { backend: String, zone: String },

    /// Hosted provider credentials are absent.
    #[error("{0} need to be configured for name.com dns client")]
    ProviderConfigMissing(String),

    /// The hosted provider answered with an error status.
    #[error("dns provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// HTTP request to the hosted provider failed.
    #[error("dns provider request failed: {0}")]
    Http(String),

    /// Key-value store operation failed.
    #[error("zone store error: {0}")]
    Store(String),

    /// Stored record data could not be (de)serialized.
    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DnsError {
    /// Configuration problems are detected before any record is touched.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured
                | Self::ZoneNotConfigured { .. }
                | Self::PrefixNotAllowed { .. }
                | Self::ConfigMissing { .. }
                | Self::ProviderConfigMissing(_)
        )
    }
}

impl From<redis::RedisError> for DnsError {
    fn from(e: redis::RedisError) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<reqwest::Error> for DnsError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}
