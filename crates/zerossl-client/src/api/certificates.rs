//! Certificate API endpoints.

use crate::ZeroSslClient;
use zerossl_core::{
    Certificate, CertificateDownload, ChallengeType, Result, VerificationOutcome,
};

/// Default validity requested for new certificates
const DEFAULT_VALIDITY_DAYS: u32 = 90;

/// Certificate API endpoints
pub struct CertificateApi<'a> {
    client: &'a ZeroSslClient,
}

impl<'a> CertificateApi<'a> {
    pub(crate) fn new(client: &'a ZeroSslClient) -> Self {
        Self { client }
    }

    /// Create a new certificate for the given domains
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cert = client.certificates()
    ///     .create(["svc.test.example.com"])
    ///     .csr(csr_pem)
    ///     .validity_days(90)
    ///     .send()
    ///     .await?;
    /// ```
    #[must_use]
    pub fn create<I, S>(&self, domains: I) -> CreateCertificateBuilder<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CreateCertificateBuilder::new(self.client, domains.into_iter().map(Into::into).collect())
    }

    /// Ask the CA to (re-)evaluate a validation method
    ///
    /// Failure envelopes are not errors here, see [`VerificationOutcome`].
    pub async fn verify(&self, cert_id: &str, challenge: ChallengeType) -> Result<VerificationOutcome> {
        let body = self
            .client
            .post_form_value(
                &format!("/certificates/{cert_id}/challenges"),
                &[("validation_method", challenge.as_str())],
            )
            .await?;
        Ok(VerificationOutcome::from_response(body))
    }

    /// Get the current state of a certificate
    pub async fn get(&self, cert_id: &str) -> Result<Certificate> {
        self.client.get(&format!("/certificates/{cert_id}")).await
    }

    /// Download an issued certificate and its CA bundle as PEM text
    pub async fn download(&self, cert_id: &str) -> Result<CertificateDownload> {
        self.client
            .get(&format!("/certificates/{cert_id}/download/return"))
            .await
    }
}

/// Builder for certificate creation requests
pub struct CreateCertificateBuilder<'a> {
    client: &'a ZeroSslClient,
    domains: Vec<String>,
    csr: String,
    validity_days: u32,
}

impl<'a> CreateCertificateBuilder<'a> {
    fn new(client: &'a ZeroSslClient, domains: Vec<String>) -> Self {
        Self {
            client,
            domains,
            csr: String::new(),
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }

    /// Set the certificate signing request (PEM)
    #[must_use]
    pub fn csr(mut self, csr: impl Into<String>) -> Self {
        self.csr = csr.into();
        self
    }

    /// Set the requested validity in days (90 or 365)
    #[must_use]
    pub const fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Create the certificate
    pub async fn send(self) -> Result<Certificate> {
        let domains = self.domains.join(",");
        let validity = self.validity_days.to_string();

        self.client
            .post_form(
                "/certificates",
                &[
                    ("certificate_domains", domains.as_str()),
                    ("certificate_validity_days", validity.as_str()),
                    ("certificate_csr", self.csr.as_str()),
                ],
            )
            .await
    }
}
