use thiserror::Error;

/// Result type alias for ZeroSSL operations
pub type Result<T> = std::result::Result<T, ZeroSslError>;

/// Errors that can occur when talking to the ZeroSSL API
#[derive(Error, Debug)]
pub enum ZeroSslError {
    /// Authentication failed - invalid or missing access key
    #[error("authentication failed: invalid access key")]
    Unauthorized,

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimited,

    /// Resource not found
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the resource that wasn't found
        resource: String,
    },

    /// API returned a non-2xx response
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the API
        message: String,
    },

    /// API answered 2xx but flagged the request as failed (`success: false`)
    #[error("request rejected by the CA ({code}): {kind}")]
    Rejected {
        /// ZeroSSL error code
        code: i64,
        /// ZeroSSL error type, e.g. `invalid_certificate_csr`
        kind: String,
    },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ZeroSslError {
    /// Returns true for failures of the HTTP exchange itself (non-2xx or no response)
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::RateLimited
                | Self::NotFound { .. }
                | Self::Api { .. }
                | Self::Http(_)
        )
    }

    /// Returns true if the error is due to authentication
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns the HTTP status code if the API answered with an error status
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::RateLimited => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
