//! Main ZeroSSL API client implementation.

use crate::api::CertificateApi;
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use zerossl_core::{ApiFailure, Result, ZeroSslError};

/// The ZeroSSL API base URL
const DEFAULT_BASE_URL: &str = "https://api.zerossl.com";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Main ZeroSSL API client
#[derive(Clone)]
pub struct ZeroSslClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    access_key: String,
    base_url: String,
}

impl std::fmt::Debug for ZeroSslClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZeroSslClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ZeroSslClient {
    /// Create a new client with the given access key using default settings
    pub fn new(access_key: impl Into<String>) -> Result<Self> {
        ZeroSslClientBuilder::new(access_key).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(access_key: impl Into<String>) -> ZeroSslClientBuilder {
        ZeroSslClientBuilder::new(access_key)
    }

    /// Access certificate endpoints
    #[must_use]
    pub fn certificates(&self) -> CertificateApi<'_> {
        CertificateApi::new(self)
    }

    /// Perform a GET request and decode the body, rejecting failure envelopes
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.send(Method::GET, path, None).await?;
        decode(body)
    }

    /// Perform a form POST and decode the body, rejecting failure envelopes
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let body = self.send(Method::POST, path, Some(params)).await?;
        decode(body)
    }

    /// Perform a form POST and return the JSON body untouched
    pub(crate) async fn post_form_value(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        self.send(Method::POST, path, Some(params)).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Value> {
        let url = self.build_url(path)?;
        // the query string carries the access key, log the path only
        debug!(method = %method, path = %path, "ZeroSSL request");

        let mut request = self.inner.http.request(method, url);
        if let Some(params) = form {
            request = request.form(params);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ZeroSslError::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Build a URL carrying the access key
    fn build_url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.inner.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| ZeroSslError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("access_key", &self.inner.access_key);
        Ok(url)
    }

    /// Handle an API response that returns JSON
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ZeroSslError::Http(e.to_string()))?;
            serde_json::from_str(&body).map_err(ZeroSslError::Json)
        } else {
            self.handle_error(status.as_u16(), response).await
        }
    }

    /// Convert an error response to a ZeroSslError
    async fn handle_error<T>(&self, status: u16, response: reqwest::Response) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        // Try to parse error type from JSON
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/type")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or(body);

        match status {
            401 => Err(ZeroSslError::Unauthorized),
            404 => Err(ZeroSslError::NotFound { resource: message }),
            429 => {
                warn!("Rate limited by ZeroSSL API");
                Err(ZeroSslError::RateLimited)
            }
            _ => Err(ZeroSslError::Api {
                code: status,
                message,
            }),
        }
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T> {
    if let Some(failure) = ApiFailure::detect(&body) {
        return Err(failure.into());
    }
    serde_json::from_value(body).map_err(ZeroSslError::Json)
}

/// Builder for configuring a [`ZeroSslClient`]
pub struct ZeroSslClientBuilder {
    access_key: String,
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl ZeroSslClientBuilder {
    /// Create a new builder with the given access key
    #[must_use]
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("zerossl-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ZeroSslClient> {
        if self.access_key.is_empty() {
            return Err(ZeroSslError::Config("access key is empty".to_string()));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| ZeroSslError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(ZeroSslClient {
            inner: Arc::new(ClientInner {
                http,
                access_key: self.access_key,
                base_url: self.base_url,
            }),
        })
    }
}
