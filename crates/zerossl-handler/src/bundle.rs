//! Issued certificate encoding.

use crate::cache::CachedCertificate;
use crate::error::{HandlerError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zerossl_core::CertificateDownload;

/// Build the `(bundle, raw)` pair handed back to ACME clients.
///
/// The bundle is the leaf followed by the CA bundle twice. `raw` is the base64
/// DER of the leaf.
pub fn encode(download: &CertificateDownload) -> Result<CachedCertificate> {
    let leaf = pem::parse(download.certificate.as_bytes())
        .map_err(|e| HandlerError::Certificate(e.to_string()))?;
    if leaf.tag() != "CERTIFICATE" {
        return Err(HandlerError::Certificate(format!(
            "unexpected PEM block '{}'",
            leaf.tag()
        )));
    }

    x509_parser::parse_x509_certificate(leaf.contents())
        .map_err(|e| HandlerError::Certificate(e.to_string()))?;

    let bundle = [
        download.certificate.as_str(),
        download.ca_bundle.as_str(),
        download.ca_bundle.as_str(),
    ]
    .join("\n");

    Ok(CachedCertificate {
        bundle,
        raw: STANDARD.encode(leaf.contents()),
    })
}
