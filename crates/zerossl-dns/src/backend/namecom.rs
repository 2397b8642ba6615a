//! name.com DNS backend.
//!
//! Uses the name.com v4 REST API to manage CNAME records.
//! API documentation: <https://www.name.com/api-docs/DNS>

use crate::error::{DnsError, Result};
use crate::options::NameComOptions;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// name.com production API base URL
const NAMECOM_API_BASE: &str = "https://api.name.com";

/// name.com sandbox API base URL
const NAMECOM_SANDBOX_BASE: &str = "https://api.dev.name.com";

/// TTL for validation records (the provider minimum)
const RECORD_TTL: u32 = 300;

/// Page size when listing records
const PAGE_SIZE: u32 = 1000;

/// Request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// name.com backend for one zone
#[derive(Clone)]
pub struct NameComBackend {
    client: Client,
    base_url: String,
    zone: String,
    username: String,
    token: String,
}

impl std::fmt::Debug for NameComBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameComBackend")
            .field("base_url", &self.base_url)
            .field("zone", &self.zone)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl NameComBackend {
    /// Create a backend for `zone`. Username and token are required.
    pub fn new(zone: &str, options: &NameComOptions) -> Result<Self> {
        let username = non_empty(options.username.as_deref());
        let token = non_empty(options.token.as_deref());
        let (Some(username), Some(token)) = (username, token) else {
            return Err(DnsError::ProviderConfigMissing("username and token".to_string()));
        };

        let base_url = options.base_url.clone().unwrap_or_else(|| {
            if options.debug {
                NAMECOM_SANDBOX_BASE.to_string()
            } else {
                NAMECOM_API_BASE.to_string()
            }
        });

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DnsError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            zone: zone.trim().to_string(),
            username: username.to_string(),
            token: token.to_string(),
        })
    }

    /// Create a CNAME record and return its id.
    ///
    /// An identical existing record is reused instead of duplicated.
    pub async fn create_cname(&self, subdomain: &str, prefix: &str, target: &str) -> Result<String> {
        let host = compose_host(subdomain, prefix);

        if let Some(existing) = self
            .find_records(&host)
            .await?
            .into_iter()
            .find(|record| record.is_cname_to(target))
        {
            debug!(zone = %self.zone, host = %host, record_id = existing.id, "CNAME record already present");
            return Ok(existing.id.to_string());
        }

        debug!(zone = %self.zone, host = %host, target = %target, "Creating CNAME record");

        let request = CreateRecordRequest {
            host: &host,
            r#type: "CNAME",
            answer: target,
            ttl: RECORD_TTL,
        };

        let response = self
            .client
            .post(self.records_url())
            .basic_auth(&self.username, Some(&self.token))
            .json(&request)
            .send()
            .await?;

        let record: Record = check(response).await?.json().await?;
        debug!(record_id = record.id, "CNAME record created");
        Ok(record.id.to_string())
    }

    /// Delete every record on the composed host.
    pub async fn delete_cname(&self, subdomain: &str, prefix: &str) -> Result<()> {
        let host = compose_host(subdomain, prefix);

        for record in self.find_records(&host).await? {
            debug!(zone = %self.zone, host = %host, record_id = record.id, "Deleting record");

            let response = self
                .client
                .delete(format!("{}/{}", self.records_url(), record.id))
                .basic_auth(&self.username, Some(&self.token))
                .send()
                .await?;

            // 404 is fine - record might already be deleted
            if response.status() == StatusCode::NOT_FOUND {
                trace!(record_id = record.id, "Record already deleted");
                continue;
            }
            check(response).await?;
        }

        Ok(())
    }

    /// Records of the zone whose host equals `host`
    async fn find_records(&self, host: &str) -> Result<Vec<Record>> {
        let mut matches = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .client
                .get(self.records_url())
                .basic_auth(&self.username, Some(&self.token))
                .query(&[("page", page), ("perPage", PAGE_SIZE)])
                .send()
                .await?;

            let listing: ListRecordsResponse = check(response).await?.json().await?;
            matches.extend(
                listing
                    .records
                    .into_iter()
                    .filter(|record| record.host.eq_ignore_ascii_case(host)),
            );

            match listing.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        trace!(zone = %self.zone, host = %host, count = matches.len(), "Listed records");
        Ok(matches)
    }

    fn records_url(&self) -> String {
        format!("{}/v4/domains/{}/records", self.base_url, self.zone)
    }
}

/// Host relative to the zone: `subdomain.prefix`, or `subdomain` alone
fn compose_host(subdomain: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        subdomain.to_string()
    } else {
        format!("{subdomain}.{prefix}")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    Err(DnsError::Provider {
        status: status.as_u16(),
        message,
    })
}

// name.com API types

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    host: &'a str,
    r#type: &'a str,
    answer: &'a str,
    ttl: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListRecordsResponse {
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: u64,
    #[serde(default)]
    host: String,
    #[serde(default, rename = "type")]
    record_type: String,
    #[serde(default)]
    answer: String,
}

impl Record {
    fn is_cname_to(&self, target: &str) -> bool {
        self.record_type.eq_ignore_ascii_case("CNAME")
            && self
                .answer
                .trim_end_matches('.')
                .eq_ignore_ascii_case(target.trim_end_matches('.'))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}
