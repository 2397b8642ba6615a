//! Backend options.

use crate::error::{DnsError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default redis host for the zone store.
const DEFAULT_REDIS_HOST: &str = "localhost";

/// Default redis port for the zone store.
const DEFAULT_REDIS_PORT: u16 = 6379;

/// The DNS backend variants a zone can be served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// CoreDNS redis plugin zone store.
    #[serde(rename = "coredns")]
    CoreDns,
    /// name.com hosted DNS.
    #[serde(rename = "namecom")]
    NameCom,
}

impl BackendKind {
    /// Configuration section name of this backend.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CoreDns => "coredns",
            Self::NameCom => "namecom",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection options of the redis-backed zone store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStoreOptions {
    /// Redis host (default: localhost).
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Redis port (default: 6379).
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Redis password.
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ZoneStoreOptions {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: None,
        }
    }
}

impl ZoneStoreOptions {
    /// `redis://` URL of this store, with the password when one is set.
    pub fn connection_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("redis://{}:{}/", self.host, self.port))
            .map_err(|e| DnsError::Store(format!("invalid redis address: {e}")))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|()| DnsError::Store("invalid redis password".to_string()))?;
        }

        Ok(url)
    }
}

/// Credentials of the name.com backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameComOptions {
    /// API username.
    #[serde(default)]
    pub username: Option<String>,

    /// API token.
    #[serde(default)]
    pub token: Option<String>,

    /// Use the name.com sandbox environment.
    #[serde(default)]
    pub debug: bool,

    /// Override the API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Options for every configured backend kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsOptions {
    /// Zone store section.
    #[serde(default)]
    pub coredns: Option<ZoneStoreOptions>,

    /// name.com section.
    #[serde(default)]
    pub namecom: Option<NameComOptions>,
}

impl DnsOptions {
    /// Enable the zone store backend.
    #[must_use]
    pub fn with_coredns(mut self, options: ZoneStoreOptions) -> Self {
        self.coredns = Some(options);
        self
    }

    /// Enable the name.com backend.
    #[must_use]
    pub fn with_namecom(mut self, options: NameComOptions) -> Self {
        self.namecom = Some(options);
        self
    }

    /// Configured backend kinds, in selection order.
    pub fn configured_kinds(&self) -> Vec<BackendKind> {
        let mut kinds = Vec::new();
        if self.coredns.is_some() {
            kinds.push(BackendKind::CoreDns);
        }
        if self.namecom.is_some() {
            kinds.push(BackendKind::NameCom);
        }
        kinds
    }
}

fn default_redis_host() -> String {
    String::from(DEFAULT_REDIS_HOST)
}

const fn default_redis_port() -> u16 {
    DEFAULT_REDIS_PORT
}
