//! Certificate authority seam of the enrollment workflow.

use async_trait::async_trait;
use zerossl_client::ZeroSslClient;
use zerossl_core::{Certificate, CertificateDownload, ChallengeType, Result, VerificationOutcome};

/// CA operations the enrollment workflow drives.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Create a draft certificate for `domains` from a PEM CSR.
    async fn create(&self, domains: &[String], csr: &str, validity_days: u32) -> Result<Certificate>;

    /// Ask the CA to re-check the CNAME challenges of `cert_id`.
    async fn verify(&self, cert_id: &str) -> Result<VerificationOutcome>;

    /// Current certificate record.
    async fn get(&self, cert_id: &str) -> Result<Certificate>;

    /// Issued leaf certificate and CA bundle.
    async fn download(&self, cert_id: &str) -> Result<CertificateDownload>;
}

#[async_trait]
impl CertificateAuthority for ZeroSslClient {
    async fn create(&self, domains: &[String], csr: &str, validity_days: u32) -> Result<Certificate> {
        self.certificates()
            .create(domains)
            .csr(csr)
            .validity_days(validity_days)
            .send()
            .await
    }

    async fn verify(&self, cert_id: &str) -> Result<VerificationOutcome> {
        self.certificates().verify(cert_id, ChallengeType::Dns).await
    }

    async fn get(&self, cert_id: &str) -> Result<Certificate> {
        self.certificates().get(cert_id).await
    }

    async fn download(&self, cert_id: &str) -> Result<CertificateDownload> {
        self.certificates().download(cert_id).await
    }
}
