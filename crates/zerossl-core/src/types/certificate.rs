use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a certificate on the CA side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CertificateStatus {
    /// Created, challenge not yet requested
    Draft,
    /// Challenge issued, not yet proven
    PendingValidation,
    /// Issued and valid
    Issued,
    /// Cancelled by the account owner or the CA
    Cancelled,
    /// Issued, close to expiry
    ExpiringSoon,
    /// Past its validity window
    Expired,
    /// A status this client does not know about
    Unknown,
}

impl CertificateStatus {
    /// Wire representation of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingValidation => "pending_validation",
            Self::Issued => "issued",
            Self::Cancelled => "cancelled",
            Self::ExpiringSoon => "expiring_soon",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }

    /// Draft and expired certificates need their domains validated again
    #[must_use]
    pub const fn needs_validation(self) -> bool {
        matches!(self, Self::Draft | Self::Expired)
    }

    /// Issued or expiring-soon: the certificate can be downloaded
    #[must_use]
    pub const fn is_issued(self) -> bool {
        matches!(self, Self::Issued | Self::ExpiringSoon)
    }

    /// Cancelled certificates never become issued
    #[must_use]
    pub const fn is_terminal_failure(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<String> for CertificateStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => Self::Draft,
            "pending_validation" => Self::PendingValidation,
            "issued" => Self::Issued,
            "cancelled" => Self::Cancelled,
            "expiring_soon" => Self::ExpiringSoon,
            "expired" => Self::Expired,
            _ => Self::Unknown,
        }
    }
}

impl From<CertificateStatus> for String {
    fn from(status: CertificateStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A certificate record as returned by create and get
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    /// Opaque certificate id
    pub id: String,

    /// Current status
    pub status: CertificateStatus,

    /// Primary domain
    #[serde(default)]
    pub common_name: Option<String>,

    /// Comma-separated additional domains
    #[serde(default)]
    pub additional_domains: Option<String>,

    /// Creation timestamp (CA local format)
    #[serde(default)]
    pub created: Option<String>,

    /// Expiry timestamp (CA local format)
    #[serde(default)]
    pub expires: Option<String>,

    /// Validation challenges, present while the certificate is a draft
    #[serde(default)]
    pub validation: Option<Validation>,
}

impl Certificate {
    /// Per-domain validation payloads, empty when the CA sent none
    #[must_use]
    pub fn domain_validations(&self) -> &BTreeMap<String, DomainValidation> {
        static EMPTY: BTreeMap<String, DomainValidation> = BTreeMap::new();
        self.validation
            .as_ref()
            .map_or(&EMPTY, |validation| &validation.other_methods)
    }
}

/// Validation section of a certificate record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Validation {
    /// Non-email methods keyed by domain
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub other_methods: BTreeMap<String, DomainValidation>,
}

/// Challenge values for a single domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainValidation {
    /// Host the CNAME record must be created on
    #[serde(default)]
    pub cname_validation_p1: Option<String>,

    /// Target the CNAME record must point to
    #[serde(default)]
    pub cname_validation_p2: Option<String>,

    /// URL for HTTP file validation
    #[serde(default)]
    pub file_validation_url_http: Option<String>,
}

impl DomainValidation {
    /// The `(host, target)` pair of the CNAME challenge when both are present
    #[must_use]
    pub fn cname(&self) -> Option<(&str, &str)> {
        match (&self.cname_validation_p1, &self.cname_validation_p2) {
            (Some(host), Some(target)) => Some((host.as_str(), target.as_str())),
            _ => None,
        }
    }
}

// The API serializes an empty map as `[]`.
fn map_or_empty_list<'de, D>(deserializer: D) -> Result<BTreeMap<String, DomainValidation>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList {
        Map(BTreeMap<String, DomainValidation>),
        List(Vec<serde_json::Value>),
    }

    match Option::<MapOrList>::deserialize(deserializer)? {
        Some(MapOrList::Map(map)) => Ok(map),
        Some(MapOrList::List(_)) | None => Ok(BTreeMap::new()),
    }
}
