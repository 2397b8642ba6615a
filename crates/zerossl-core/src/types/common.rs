use crate::ZeroSslError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error envelope the API returns with a 2xx status (`{"success": false, "error": {...}}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFailure {
    /// Always `false` for a failure envelope
    pub success: bool,

    /// Error description
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// Body of an API failure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Numeric ZeroSSL error code
    #[serde(default)]
    pub code: i64,

    /// Symbolic error type
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl ApiFailure {
    /// Detect a failure envelope in a response body
    #[must_use]
    pub fn detect(body: &Value) -> Option<Self> {
        if body.get("success").and_then(Value::as_bool) != Some(false) {
            return None;
        }
        Some(serde_json::from_value(body.clone()).unwrap_or(Self {
            success: false,
            error: None,
        }))
    }
}

impl From<ApiFailure> for ZeroSslError {
    fn from(failure: ApiFailure) -> Self {
        let body = failure.error.unwrap_or_default();
        Self::Rejected {
            code: body.code,
            kind: if body.kind.is_empty() {
                "unknown_error".to_string()
            } else {
                body.kind
            },
        }
    }
}
