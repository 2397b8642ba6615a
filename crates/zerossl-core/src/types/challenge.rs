use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Domain validation method accepted by the challenges endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeType {
    /// File served over HTTP(S)
    #[serde(rename = "HTTPS_CSR_HASH")]
    Http,
    /// CNAME record in DNS
    #[serde(rename = "CNAME_CSR_HASH")]
    Dns,
}

impl ChallengeType {
    /// Value of the `validation_method` form field
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "HTTPS_CSR_HASH",
            Self::Dns => "CNAME_CSR_HASH",
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of asking the CA to (re-)evaluate a challenge
///
/// The API answers either with `{"success": false, "details"|"error": ...}` or,
/// once validation has gone through, with the certificate object itself and no
/// `success` key at all. The second shape is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// The CA could not validate yet
    Failed {
        /// Failure details as reported by the CA
        details: String,
    },
    /// Validation went through; carries the response body
    Validated(Value),
}

impl VerificationOutcome {
    /// Classify a challenges response body
    #[must_use]
    pub fn from_response(body: Value) -> Self {
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let details = body
                .get("details")
                .or_else(|| body.get("error"))
                .map_or_else(|| "no details given".to_string(), render);
            return Self::Failed { details };
        }
        Self::Validated(body)
    }

    /// Returns true if the CA accepted the challenge
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        matches!(self, Self::Validated(_))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
