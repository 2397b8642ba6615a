//! CA handler plugin contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text of operations the handler does not support.
pub const NOT_IMPLEMENTED: &str = "Method not implemented.";

/// Outcome of an enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollResponse {
    /// Human-readable failure, `None` on success.
    pub error: Option<String>,
    /// PEM full chain.
    pub bundle: Option<String>,
    /// Base64 DER of the leaf certificate.
    pub raw: Option<String>,
    /// Identifier to poll a pending enrollment with.
    pub poll_identifier: Option<String>,
}

impl EnrollResponse {
    /// Failed enrollment with no artifacts.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Returns true if a certificate was issued.
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of polling a pending enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub error: Option<String>,
    pub bundle: Option<String>,
    pub raw: Option<String>,
    pub poll_identifier: Option<String>,
    /// The CA rejected the request for good.
    pub rejected: bool,
}

/// Outcome of a revocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeResponse {
    pub error: Option<String>,
    pub bundle: Option<String>,
    pub raw: Option<String>,
}

/// Outcome of a CA-initiated trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub error: Option<String>,
    pub bundle: Option<String>,
    pub raw: Option<String>,
}

/// Operations an ACME gateway calls on its CA handler.
///
/// Failures are reported in the response `error` field, never as `Err`.
#[async_trait]
pub trait CaHandler: Send + Sync {
    /// Issue a certificate for the names in `csr` (PEM, base64 DER, or DER).
    async fn enroll(&self, csr: &[u8]) -> EnrollResponse;

    /// Check on an enrollment that returned a poll identifier.
    async fn poll(&self, cert_name: &str, poll_identifier: Option<&str>, csr: &[u8])
        -> PollResponse;

    /// Revoke `cert` (PEM) for `reason` effective at `date`.
    async fn revoke(&self, cert: &str, reason: &str, date: Option<&str>) -> RevokeResponse;

    /// Handle an asynchronous CA callback.
    async fn trigger(&self, payload: &Value) -> TriggerResponse;
}
