//! Enrollment orchestrator.

use crate::authority::CertificateAuthority;
use crate::bundle;
use crate::cache::{CachedCertificate, DomainSet, PrefetchCache};
use crate::config::HandlerConfig;
use crate::csr::CertificateRequest;
use crate::error::{HandlerError, Result};
use crate::lifecycle::{
    CaHandler, EnrollResponse, PollResponse, RevokeResponse, TriggerResponse, NOT_IMPLEMENTED,
};
use crate::locks::DomainLocks;
use crate::policy::EnrollmentPolicy;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zerossl_client::ZeroSslClient;
use zerossl_core::{Certificate, VerificationOutcome};
use zerossl_dns::{CnameProvisioner, DnsClient};

/// Default prefetch cache lifetime (10 hours).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60 * 60);

/// Certificate returned by [`ZeroSslHandler::prefetch`].
pub type PrefetchedCertificate = CachedCertificate;

/// A validation record created during one enrollment.
#[derive(Debug)]
struct Provisioned {
    domain: String,
    host: String,
}

/// Issues certificates through ZeroSSL, proving domain control with CNAME
/// records created through the DNS client.
pub struct ZeroSslHandler {
    ca: Arc<dyn CertificateAuthority>,
    dns: Arc<dyn CnameProvisioner>,
    cache: PrefetchCache,
    locks: DomainLocks,
    policy: EnrollmentPolicy,
}

impl std::fmt::Debug for ZeroSslHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZeroSslHandler")
            .field("policy", &self.policy)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ZeroSslHandler {
    /// Create a handler builder around a CA and a DNS provisioner.
    pub fn builder(
        ca: Arc<dyn CertificateAuthority>,
        dns: Arc<dyn CnameProvisioner>,
    ) -> ZeroSslHandlerBuilder {
        ZeroSslHandlerBuilder::new(ca, dns)
    }

    /// Create a handler from configuration.
    ///
    /// Fails when the CA client cannot be built or no DNS backend is configured.
    pub fn from_config(config: &HandlerConfig) -> Result<Self> {
        let mut client = ZeroSslClient::builder(&config.ca.access_key);
        if let Some(base_url) = &config.ca.base_url {
            client = client.base_url(base_url);
        }
        let ca = client.build()?;
        let dns = DnsClient::new(config.zones(), config.dns_options())?;

        Ok(Self::builder(Arc::new(ca), Arc::new(dns))
            .policy(config.policy())
            .cache(config.prefetch_cache())
            .build())
    }

    /// Enrollment bounds in use.
    pub const fn policy(&self) -> &EnrollmentPolicy {
        &self.policy
    }

    /// Prefetch cache.
    pub const fn cache(&self) -> &PrefetchCache {
        &self.cache
    }

    /// Issue a certificate for `csr` (PEM, base64 DER, or DER).
    ///
    /// Errors are [`HandlerError::Enrollment`] carrying the message an ACME
    /// client gets to see.
    pub async fn issue(&self, csr: &[u8]) -> Result<CachedCertificate> {
        let request = CertificateRequest::parse(csr).map_err(|e| configuration_error(&e))?;
        for name in request.names() {
            self.dns
                .verify(name)
                .await
                .map_err(|e| configuration_error(&e))?;
        }

        let domains = DomainSet::new(request.names());
        let _guard = self.locks.acquire(&domains).await;

        match self.cache.get(&domains).await {
            Ok(Some(cached)) => {
                info!(domains = %domains, "Serving prefetched certificate");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!(domains = %domains, error = %e, "Prefetch cache lookup failed"),
        }

        let issued = self.run(&request).await?;
        self.remember(&domains, &issued).await;
        info!(domains = %domains, "Certificate issued");
        Ok(issued)
    }

    /// Issue a certificate and also cache it under `domains`.
    pub async fn prefetch<I, S>(&self, domains: I, csr: &str) -> Result<PrefetchedCertificate>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let issued = self.issue(csr.as_bytes()).await?;
        self.remember(&DomainSet::new(domains), &issued).await;
        Ok(issued)
    }

    /// Cache an issued certificate; store failures are logged only.
    async fn remember(&self, domains: &DomainSet, issued: &CachedCertificate) {
        if let Err(e) = self.cache.insert(domains, issued).await {
            warn!(domains = %domains, error = %e, "Failed to cache issued certificate");
        }
    }

    /// Create, validate, poll, clean up, download.
    async fn run(&self, request: &CertificateRequest) -> Result<CachedCertificate> {
        let certificate = self
            .ca
            .create(request.names(), request.pem(), self.policy.validity_days)
            .await
            .map_err(|e| failure(format!("error while creating certificate: {e}")))?;
        info!(
            cert_id = %certificate.id,
            status = %certificate.status,
            "Certificate created"
        );

        let mut provisioned = Vec::new();
        if certificate.status.needs_validation() {
            provisioned = self.provision(&certificate).await?;
            self.try_verify_domain(&certificate.id).await?;
        }

        let polled = self.poll_until_issued(&certificate.id).await;
        let cleaned = self.cleanup(&provisioned).await;
        polled?;
        cleaned?;

        let download = self
            .ca
            .download(&certificate.id)
            .await
            .map_err(|e| failure(format!("error while downloading certificate: {e}")))?;
        bundle::encode(&download).map_err(|e| failure(e.to_string()))
    }

    /// Create one CNAME per validated domain.
    ///
    /// Every domain is attempted; on failure the records created so far are
    /// removed again and the first error is returned.
    async fn provision(&self, certificate: &Certificate) -> Result<Vec<Provisioned>> {
        let mut provisioned = Vec::new();
        let mut error = None;

        for (domain, validation) in certificate.domain_validations() {
            let Some((host, target)) = validation.cname() else {
                error.get_or_insert_with(|| {
                    format!("error while registering dns records for {domain}: no CNAME challenge")
                });
                continue;
            };

            match self.dns.create_cname(host, target).await {
                Ok(()) => {
                    debug!(domain = %domain, host = %host, target = %target, "Validation record created");
                    provisioned.push(Provisioned {
                        domain: domain.clone(),
                        host: host.to_string(),
                    });
                }
                Err(e) => {
                    warn!(domain = %domain, host = %host, error = %e, "Failed to create validation record");
                    error.get_or_insert_with(|| {
                        format!(
                            "error while registering dns records '{host} -> {target}' for {domain}: {e}"
                        )
                    });
                }
            }
        }

        match error {
            None => Ok(provisioned),
            Some(message) => {
                // rollback errors are logged only
                let _ = self.cleanup(&provisioned).await;
                Err(failure(message))
            }
        }
    }

    /// Ask the CA to check the challenges, up to `verify_trials` times.
    async fn try_verify_domain(&self, cert_id: &str) -> Result<()> {
        let mut details = String::from("no details given");

        for attempt in 1..=self.policy.verify_trials {
            match self.ca.verify(cert_id).await {
                Ok(VerificationOutcome::Validated(_)) => {
                    debug!(cert_id = %cert_id, attempt, "Challenge validated");
                    return Ok(());
                }
                Ok(VerificationOutcome::Failed { details: reason }) => {
                    debug!(cert_id = %cert_id, attempt, details = %reason, "Challenge not validated yet");
                    details = reason;
                }
                Err(e) => {
                    details = e.to_string();
                    break;
                }
            }
        }

        Err(failure(format!(
            "could not verify the challenge for one of the domains: {details}"
        )))
    }

    /// Poll until the certificate is issued, cancelled, or the timeout passes.
    async fn poll_until_issued(&self, cert_id: &str) -> Result<()> {
        let started = Instant::now();

        while started.elapsed() < self.policy.poll_timeout {
            let certificate = self
                .ca
                .get(cert_id)
                .await
                .map_err(|e| failure(format!("error while polling certificate status: {e}")))?;

            if certificate.status.is_issued() {
                debug!(cert_id = %cert_id, status = %certificate.status, "Certificate ready");
                return Ok(());
            }
            if certificate.status.is_terminal_failure() {
                return Err(failure(format!(
                    "certificate {cert_id} was {} while waiting for it to be issued",
                    certificate.status
                )));
            }

            tokio::time::sleep(self.policy.poll_delay).await;
        }

        Err(failure(format!(
            "timeout ({}s) while waiting for certificate to be issued",
            self.policy.poll_timeout.as_secs()
        )))
    }

    /// Delete every provisioned record; the first failure is returned.
    async fn cleanup(&self, provisioned: &[Provisioned]) -> Result<()> {
        let mut error = None;

        for record in provisioned {
            match self.dns.delete_cname(&record.host).await {
                Ok(()) => debug!(domain = %record.domain, host = %record.host, "Validation record removed"),
                Err(e) => {
                    warn!(domain = %record.domain, host = %record.host, error = %e, "Failed to remove validation record");
                    error.get_or_insert_with(|| {
                        format!("error while dns records cleanup for {}: {e}", record.domain)
                    });
                }
            }
        }

        error.map_or(Ok(()), |message| Err(failure(message)))
    }
}

#[async_trait]
impl CaHandler for ZeroSslHandler {
    async fn enroll(&self, csr: &[u8]) -> EnrollResponse {
        debug!("CA handler enroll");
        match self.issue(csr).await {
            Ok(issued) => EnrollResponse {
                error: None,
                bundle: Some(issued.bundle),
                raw: Some(issued.raw),
                poll_identifier: None,
            },
            Err(e) => {
                warn!(error = %e, "Enrollment failed");
                EnrollResponse::failed(e.to_string())
            }
        }
    }

    async fn poll(&self, _cert_name: &str, poll_identifier: Option<&str>, _csr: &[u8]) -> PollResponse {
        PollResponse {
            error: Some(NOT_IMPLEMENTED.to_string()),
            poll_identifier: poll_identifier.map(str::to_string),
            ..PollResponse::default()
        }
    }

    async fn revoke(&self, _cert: &str, _reason: &str, _date: Option<&str>) -> RevokeResponse {
        RevokeResponse {
            error: Some(NOT_IMPLEMENTED.to_string()),
            ..RevokeResponse::default()
        }
    }

    async fn trigger(&self, _payload: &Value) -> TriggerResponse {
        TriggerResponse {
            error: Some(NOT_IMPLEMENTED.to_string()),
            ..TriggerResponse::default()
        }
    }
}

/// Builder for [`ZeroSslHandler`].
pub struct ZeroSslHandlerBuilder {
    ca: Arc<dyn CertificateAuthority>,
    dns: Arc<dyn CnameProvisioner>,
    policy: EnrollmentPolicy,
    cache: PrefetchCache,
}

impl ZeroSslHandlerBuilder {
    /// Create a builder with default policy and an in-process cache.
    pub fn new(ca: Arc<dyn CertificateAuthority>, dns: Arc<dyn CnameProvisioner>) -> Self {
        Self {
            ca,
            dns,
            policy: EnrollmentPolicy::default(),
            cache: PrefetchCache::new(DEFAULT_CACHE_TTL),
        }
    }

    /// Set the enrollment bounds.
    #[must_use]
    pub const fn policy(mut self, policy: EnrollmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the prefetch cache, e.g. one shared with other handlers.
    #[must_use]
    pub fn cache(mut self, cache: PrefetchCache) -> Self {
        self.cache = cache;
        self
    }

    /// Build the handler.
    pub fn build(self) -> ZeroSslHandler {
        ZeroSslHandler {
            ca: self.ca,
            dns: self.dns,
            cache: self.cache,
            locks: DomainLocks::new(),
            policy: self.policy,
        }
    }
}

fn configuration_error(e: &dyn Display) -> HandlerError {
    HandlerError::Enrollment(format!("configuration error: {e}"))
}

const fn failure(message: String) -> HandlerError {
    HandlerError::Enrollment(message)
}
