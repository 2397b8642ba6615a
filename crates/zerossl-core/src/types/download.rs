use serde::{Deserialize, Serialize};

/// Inline certificate download (`/download/return`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDownload {
    /// Leaf certificate, PEM
    #[serde(rename = "certificate.crt")]
    pub certificate: String,

    /// CA bundle, PEM
    #[serde(rename = "ca_bundle.crt")]
    pub ca_bundle: String,
}
