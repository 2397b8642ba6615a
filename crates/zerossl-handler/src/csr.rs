//! Certificate signing request decoding.

use crate::error::{HandlerError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::FromDer;

const PEM_TAGS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// A decoded CSR and the DNS names it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pem: String,
    names: Vec<String>,
}

impl CertificateRequest {
    /// Decode a CSR given as PEM, base64-encoded DER text, or raw DER.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let der = decode(input)?;
        let names = requested_names(&der)?;
        if names.is_empty() {
            return Err(HandlerError::Csr("no domain names in request".to_string()));
        }

        Ok(Self {
            pem: pem::encode(&pem::Pem::new(PEM_TAGS[0], der)),
            names,
        })
    }

    /// CSR as PEM text.
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Lowercase DNS names: the common name first, then the alternative names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Common name first, then SAN DNS names; lowercased, deduplicated.
fn requested_names(der: &[u8]) -> Result<Vec<String>> {
    let (_, request) = X509CertificationRequest::from_der(der)
        .map_err(|e| HandlerError::Csr(format!("malformed certification request: {e}")))?;

    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim().to_ascii_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    };

    for cn in request.certification_request_info.subject.iter_common_name() {
        if let Ok(cn) = cn.as_str() {
            push(cn);
        }
    }

    if let Some(extensions) = request.requested_extensions() {
        for extension in extensions {
            if let ParsedExtension::SubjectAlternativeName(san) = extension {
                for name in &san.general_names {
                    if let GeneralName::DNSName(dns) = name {
                        push(*dns);
                    }
                }
            }
        }
    }

    Ok(names)
}

fn decode(input: &[u8]) -> Result<Vec<u8>> {
    // DER always starts with a SEQUENCE tag
    if input.first() == Some(&0x30) {
        return Ok(input.to_vec());
    }

    let text = std::str::from_utf8(input)
        .map_err(|_| HandlerError::Csr("neither DER nor text".to_string()))?;

    if text.contains("-----BEGIN") {
        let block = pem::parse(text).map_err(|e| HandlerError::Csr(e.to_string()))?;
        if !PEM_TAGS.contains(&block.tag()) {
            return Err(HandlerError::Csr(format!(
                "unexpected PEM block '{}'",
                block.tag()
            )));
        }
        return Ok(block.into_contents());
    }

    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| HandlerError::Csr(format!("invalid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    fn request(cn: Option<&str>, sans: &[&str]) -> rcgen::CertificateSigningRequest {
        let key = KeyPair::generate().unwrap();
        let mut params =
            CertificateParams::new(sans.iter().map(|s| (*s).to_string()).collect::<Vec<_>>())
                .unwrap();
        let mut dn = DistinguishedName::new();
        if let Some(cn) = cn {
            dn.push(DnType::CommonName, cn);
        }
        params.distinguished_name = dn;
        params.serialize_request(&key).unwrap()
    }

    #[test]
    fn test_parse_pem() {
        let csr = request(
            Some("Svc.Test.Example.com"),
            &["svc.test.example.com", "api.test.example.com"],
        );
        let parsed = CertificateRequest::parse(csr.pem().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed.names(), ["svc.test.example.com", "api.test.example.com"]);
        assert!(parsed.pem().starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
    }

    #[test]
    fn test_parse_der_and_base64() {
        let csr = request(None, &["a.example.com"]);
        let der = csr.der().to_vec();

        let from_der = CertificateRequest::parse(&der).unwrap();
        assert_eq!(from_der.names(), ["a.example.com"]);

        let encoded = STANDARD.encode(&der);
        let from_b64 = CertificateRequest::parse(encoded.as_bytes()).unwrap();
        assert_eq!(from_b64, from_der);
    }

    #[test]
    fn test_request_without_names() {
        let csr = request(None, &[]);
        let err = CertificateRequest::parse(csr.der()).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_garbage_input() {
        assert!(CertificateRequest::parse(b"not a csr").is_err());
        let certificate = b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(CertificateRequest::parse(certificate).is_err());
    }
}
