//! End-to-end enrollment scenarios against a scripted CA and a recording
//! DNS provisioner backed by an in-memory zone store.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zerossl_handler::zerossl_core::{
    self, Certificate, CertificateDownload, CertificateStatus, VerificationOutcome, ZeroSslError,
};
use zerossl_handler::zerossl_dns::{
    self, CnameProvisioner, DnsClient, DnsOptions, Domain, HostParts, MemoryHashStore,
    ZoneStoreOptions,
};
use zerossl_handler::{
    CacheStore, CaHandler, CertificateAuthority, DomainSet, HandlerError, MemoryCacheStore,
    PrefetchCache, ZeroSslHandler,
};

const LEAF_NAME: &str = "svc.test.example.com";

/// CA double answering from scripts and recording every call.
struct ScriptedCa {
    validations: Vec<(&'static str, &'static str, &'static str)>,
    create_status: CertificateStatus,
    reject_create: bool,
    verify_script: Mutex<VecDeque<VerificationOutcome>>,
    verify_default: VerificationOutcome,
    verify_fails: bool,
    status_script: Mutex<VecDeque<CertificateStatus>>,
    status_default: CertificateStatus,
    get_fails: bool,
    download: CertificateDownload,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedCa {
    fn new(validations: Vec<(&'static str, &'static str, &'static str)>) -> Self {
        Self {
            validations,
            create_status: CertificateStatus::Draft,
            reject_create: false,
            verify_script: Mutex::new(VecDeque::new()),
            verify_default: VerificationOutcome::Validated(json!({"id": "cert-1"})),
            verify_fails: false,
            status_script: Mutex::new(VecDeque::new()),
            status_default: CertificateStatus::Issued,
            get_fails: false,
            download: download(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn certificate(&self, status: CertificateStatus) -> Certificate {
        let mut other_methods = Map::new();
        for (domain, host, target) in &self.validations {
            other_methods.insert(
                (*domain).to_string(),
                json!({"cname_validation_p1": host, "cname_validation_p2": target}),
            );
        }
        serde_json::from_value(json!({
            "id": "cert-1",
            "status": status.as_str(),
            "common_name": LEAF_NAME,
            "validation": {"other_methods": Value::Object(other_methods)}
        }))
        .unwrap()
    }
}

#[async_trait]
impl CertificateAuthority for ScriptedCa {
    async fn create(
        &self,
        domains: &[String],
        csr: &str,
        validity_days: u32,
    ) -> zerossl_core::Result<Certificate> {
        self.record("create");
        assert!(!domains.is_empty());
        assert!(csr.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        assert_eq!(validity_days, 90);

        if self.reject_create {
            return Err(ZeroSslError::Rejected {
                code: 2802,
                kind: "invalid_certificate_csr".into(),
            });
        }
        Ok(self.certificate(self.create_status))
    }

    async fn verify(&self, _cert_id: &str) -> zerossl_core::Result<VerificationOutcome> {
        self.record("verify");
        if self.verify_fails {
            return Err(ZeroSslError::Http("connection reset".into()));
        }
        let next = self.verify_script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.verify_default.clone()))
    }

    async fn get(&self, _cert_id: &str) -> zerossl_core::Result<Certificate> {
        self.record("get");
        if self.get_fails {
            return Err(ZeroSslError::Http("connection reset".into()));
        }
        let next = self.status_script.lock().unwrap().pop_front();
        Ok(self.certificate(next.unwrap_or(self.status_default)))
    }

    async fn download(&self, _cert_id: &str) -> zerossl_core::Result<CertificateDownload> {
        self.record("download");
        Ok(self.download.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DnsCall {
    Create(String, String),
    Delete(String),
}

/// Real zone routing over a memory store, with recorded record changes.
struct RecordingDns {
    inner: DnsClient,
    store: Arc<MemoryHashStore>,
    fail_on: Option<&'static str>,
    fail_delete_on: Option<&'static str>,
    calls: Mutex<Vec<DnsCall>>,
}

impl RecordingDns {
    fn new() -> Self {
        let store = Arc::new(MemoryHashStore::new());
        let inner = DnsClient::new(
            vec![Domain::new("example.com", ["test"])],
            DnsOptions::default().with_coredns(ZoneStoreOptions::default()),
        )
        .unwrap()
        .with_store(store.clone());

        Self {
            inner,
            store,
            fail_on: None,
            fail_delete_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(host: &'static str) -> Self {
        Self {
            fail_on: Some(host),
            ..Self::new()
        }
    }

    fn failing_delete_on(host: &'static str) -> Self {
        Self {
            fail_delete_on: Some(host),
            ..Self::new()
        }
    }

    fn calls(&self) -> Vec<DnsCall> {
        self.calls.lock().unwrap().clone()
    }

    fn deletes_of(&self, host: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, DnsCall::Delete(h) if h == host))
            .count()
    }

    fn records(&self) -> usize {
        self.store.field_count("example.com.")
    }
}

#[async_trait]
impl CnameProvisioner for RecordingDns {
    async fn verify(&self, host: &str) -> zerossl_dns::Result<HostParts> {
        self.inner.verify(host).await
    }

    async fn create_cname(&self, host: &str, target: &str) -> zerossl_dns::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(DnsCall::Create(host.to_string(), target.to_string()));
        if self.fail_on == Some(host) {
            return Err(zerossl_dns::DnsError::Store("connection refused".into()));
        }
        self.inner.create_cname(host, target).await
    }

    async fn delete_cname(&self, host: &str) -> zerossl_dns::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(DnsCall::Delete(host.to_string()));
        if self.fail_delete_on == Some(host) {
            return Err(zerossl_dns::DnsError::Store("delete refused".into()));
        }
        self.inner.delete_cname(host).await
    }
}

fn self_signed_pem(name: &str) -> (String, Vec<u8>) {
    let key = KeyPair::generate().unwrap();
    let cert = CertificateParams::new(vec![name.to_string()])
        .unwrap()
        .self_signed(&key)
        .unwrap();
    (cert.pem(), cert.der().to_vec())
}

fn download() -> CertificateDownload {
    CertificateDownload {
        certificate: self_signed_pem(LEAF_NAME).0,
        ca_bundle: self_signed_pem("ca.invalid").0,
    }
}

fn signing_request(names: &[&str]) -> rcgen::CertificateSigningRequest {
    let key = KeyPair::generate().unwrap();
    let mut params =
        CertificateParams::new(names.iter().map(|n| (*n).to_string()).collect::<Vec<_>>())
            .unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, names[0]);
    params.distinguished_name = dn;
    params.serialize_request(&key).unwrap()
}

fn csr(names: &[&str]) -> String {
    signing_request(names).pem().unwrap()
}

fn handler(ca: &Arc<ScriptedCa>, dns: &Arc<RecordingDns>) -> ZeroSslHandler {
    ZeroSslHandler::builder(ca.clone(), dns.clone()).build()
}

fn single_validation() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![(LEAF_NAME, "_x.example.com", "target.ca.invalid")]
}

fn two_validations() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        ("api.test.example.com", "_a.example.com", "a.ca.invalid"),
        (LEAF_NAME, "_x.example.com", "target.ca.invalid"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_happy_path() {
    let ca = ScriptedCa {
        verify_script: Mutex::new(VecDeque::from([
            VerificationOutcome::Failed {
                details: "pending".into(),
            },
            VerificationOutcome::Failed {
                details: "pending".into(),
            },
        ])),
        status_script: Mutex::new(VecDeque::from([
            CertificateStatus::PendingValidation,
            CertificateStatus::PendingValidation,
        ])),
        ..ScriptedCa::new(single_validation())
    };
    let expected = ca.download.clone();
    let ca = Arc::new(ca);
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    assert_eq!(response.error, None);
    assert_eq!(
        dns.calls(),
        vec![
            DnsCall::Create("_x.example.com".into(), "target.ca.invalid".into()),
            DnsCall::Delete("_x.example.com".into()),
        ]
    );
    assert_eq!(ca.calls("verify"), 3);
    assert_eq!(ca.calls("get"), 3);
    assert_eq!(ca.calls("download"), 1);
    assert_eq!(dns.records(), 0);

    assert_eq!(
        response.bundle.as_deref(),
        Some(
            format!(
                "{}\n{}\n{}",
                expected.certificate, expected.ca_bundle, expected.ca_bundle
            )
            .as_str()
        )
    );
    let raw = STANDARD.decode(response.raw.unwrap()).unwrap();
    let leaf = pem::parse(&expected.certificate).unwrap();
    assert_eq!(raw, leaf.contents());
    assert!(response.poll_identifier.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_verification_exhaustion() {
    let ca = Arc::new(ScriptedCa {
        verify_default: VerificationOutcome::Failed {
            details: "pending".into(),
        },
        ..ScriptedCa::new(single_validation())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    assert_eq!(
        response.error.as_deref(),
        Some("could not verify the challenge for one of the domains: pending")
    );
    assert!(response.bundle.is_none());
    assert_eq!(ca.calls("verify"), 6);
    assert_eq!(ca.calls("get"), 0);
    // records stay in place for a later attempt
    assert_eq!(dns.deletes_of("_x.example.com"), 0);
    assert_eq!(dns.records(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_still_cleans_up() {
    let ca = Arc::new(ScriptedCa {
        status_default: CertificateStatus::PendingValidation,
        ..ScriptedCa::new(two_validations())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler
        .enroll(csr(&[LEAF_NAME, "api.test.example.com"]).as_bytes())
        .await;

    assert_eq!(
        response.error.as_deref(),
        Some("timeout (180s) while waiting for certificate to be issued")
    );
    assert!(ca.calls("get") > 1);
    assert_eq!(ca.calls("download"), 0);
    assert_eq!(dns.deletes_of("_a.example.com"), 1);
    assert_eq!(dns.deletes_of("_x.example.com"), 1);
    assert_eq!(dns.records(), 0);
}

#[tokio::test]
async fn test_configuration_error_makes_no_ca_calls() {
    let ca = Arc::new(ScriptedCa::new(single_validation()));
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&["svc.prod.example.com"]).as_bytes()).await;
    assert_eq!(
        response.error.as_deref(),
        Some("configuration error: 'prod' prefix is not allowed in 'example.com' configuration")
    );

    let response = handler.enroll(csr(&["svc.test.other.org"]).as_bytes()).await;
    assert_eq!(
        response.error.as_deref(),
        Some("configuration error: main/parent domain of 'svc.test.other.org' is not configured")
    );

    assert_eq!(ca.total_calls(), 0);
    assert!(dns.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_enrollment_is_served_from_cache() {
    let ca = Arc::new(ScriptedCa::new(single_validation()));
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);
    let request = csr(&[LEAF_NAME]);

    let first = handler.enroll(request.as_bytes()).await;
    let second = handler.enroll(request.as_bytes()).await;

    assert_eq!(first.error, None);
    assert_eq!(first, second);
    assert_eq!(ca.calls("create"), 1);
    assert!(handler
        .cache()
        .get(&DomainSet::new([LEAF_NAME]))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_enrollments_issue_once() {
    let ca = Arc::new(ScriptedCa {
        status_script: Mutex::new(VecDeque::from([CertificateStatus::PendingValidation; 5])),
        ..ScriptedCa::new(single_validation())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);
    let request = csr(&[LEAF_NAME]);

    let (a, b) = tokio::join!(
        handler.enroll(request.as_bytes()),
        handler.enroll(request.as_bytes())
    );

    assert_eq!(a.error, None);
    assert_eq!(a, b);
    assert_eq!(ca.calls("create"), 1);
    assert_eq!(dns.deletes_of("_x.example.com"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_certificate_fails_and_cleans_up() {
    let ca = Arc::new(ScriptedCa {
        status_default: CertificateStatus::Cancelled,
        ..ScriptedCa::new(single_validation())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    let error = response.error.unwrap();
    assert!(error.contains("cancelled"), "{error}");
    assert_eq!(ca.calls("get"), 1);
    assert_eq!(dns.deletes_of("_x.example.com"), 1);
}

#[tokio::test]
async fn test_failed_provisioning_rolls_back() {
    let ca = Arc::new(ScriptedCa::new(two_validations()));
    let dns = Arc::new(RecordingDns::failing_on("_x.example.com"));
    let handler = handler(&ca, &dns);

    let response = handler
        .enroll(csr(&[LEAF_NAME, "api.test.example.com"]).as_bytes())
        .await;

    assert_eq!(
        response.error.as_deref(),
        Some(
            "error while registering dns records '_x.example.com -> target.ca.invalid' \
             for svc.test.example.com: zone store error: connection refused"
        )
    );
    assert_eq!(ca.calls("verify"), 0);
    assert_eq!(ca.calls("get"), 0);
    assert_eq!(dns.deletes_of("_a.example.com"), 1);
    assert_eq!(dns.records(), 0);
}

#[tokio::test]
async fn test_rejected_create() {
    let ca = Arc::new(ScriptedCa {
        reject_create: true,
        ..ScriptedCa::new(single_validation())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    assert_eq!(
        response.error.as_deref(),
        Some(
            "error while creating certificate: request rejected by the CA (2802): \
             invalid_certificate_csr"
        )
    );
    assert!(dns.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_already_validated_certificate_skips_dns() {
    let ca = Arc::new(ScriptedCa {
        create_status: CertificateStatus::PendingValidation,
        ..ScriptedCa::new(single_validation())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    assert_eq!(response.error, None);
    assert!(dns.calls().is_empty());
    assert_eq!(ca.calls("verify"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_prefetch() {
    let ca = Arc::new(ScriptedCa::new(single_validation()));
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let issued = handler
        .prefetch(["SVC.test.example.com"], &csr(&[LEAF_NAME]))
        .await
        .unwrap();
    let cached = handler
        .cache()
        .get(&DomainSet::new([LEAF_NAME]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(issued, cached);

    let err = handler
        .prefetch(["svc.prod.example.com"], &csr(&["svc.prod.example.com"]))
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Enrollment(ref msg) if msg.starts_with("configuration error")));
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_failure_does_not_stop_other_cleanups() {
    let ca = Arc::new(ScriptedCa::new(two_validations()));
    let dns = Arc::new(RecordingDns::failing_delete_on("_a.example.com"));
    let handler = handler(&ca, &dns);

    let response = handler
        .enroll(csr(&[LEAF_NAME, "api.test.example.com"]).as_bytes())
        .await;

    assert_eq!(
        response.error.as_deref(),
        Some(
            "error while dns records cleanup for api.test.example.com: \
             zone store error: delete refused"
        )
    );
    assert_eq!(
        dns.calls(),
        vec![
            DnsCall::Create("_a.example.com".into(), "a.ca.invalid".into()),
            DnsCall::Create("_x.example.com".into(), "target.ca.invalid".into()),
            DnsCall::Delete("_a.example.com".into()),
            DnsCall::Delete("_x.example.com".into()),
        ]
    );
    assert_eq!(ca.calls("download"), 0);
    assert!(handler
        .cache()
        .get(&DomainSet::new([LEAF_NAME, "api.test.example.com"]))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn test_verify_transport_error_stops_retrying() {
    let ca = Arc::new(ScriptedCa {
        verify_fails: true,
        ..ScriptedCa::new(single_validation())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    assert_eq!(
        response.error.as_deref(),
        Some(
            "could not verify the challenge for one of the domains: \
             HTTP request failed: connection reset"
        )
    );
    assert_eq!(ca.calls("verify"), 1);
    assert_eq!(ca.calls("get"), 0);
    assert_eq!(ca.calls("download"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_polling_transport_error_cleans_up() {
    let ca = Arc::new(ScriptedCa {
        get_fails: true,
        ..ScriptedCa::new(single_validation())
    });
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let response = handler.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    assert_eq!(
        response.error.as_deref(),
        Some("error while polling certificate status: HTTP request failed: connection reset")
    );
    assert_eq!(ca.calls("get"), 1);
    assert_eq!(ca.calls("download"), 0);
    assert_eq!(dns.deletes_of("_x.example.com"), 1);
    assert_eq!(dns.records(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_enroll_with_der_csr() {
    let ca = Arc::new(ScriptedCa::new(single_validation()));
    let dns = Arc::new(RecordingDns::new());
    let handler = handler(&ca, &dns);

    let der = signing_request(&[LEAF_NAME]).der().to_vec();
    let response = handler.enroll(&der).await;

    assert_eq!(response.error, None);
    assert!(response.bundle.is_some());
    assert_eq!(ca.calls("create"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_handlers_sharing_a_cache_issue_once() {
    let ca = Arc::new(ScriptedCa::new(single_validation()));
    let dns = Arc::new(RecordingDns::new());
    let cache = PrefetchCache::with_store(
        Duration::from_secs(36_000),
        Arc::new(MemoryCacheStore::new()),
    );
    let first = ZeroSslHandler::builder(ca.clone(), dns.clone())
        .cache(cache.clone())
        .build();
    let second = ZeroSslHandler::builder(ca.clone(), dns.clone())
        .cache(cache)
        .build();

    let a = first.enroll(csr(&[LEAF_NAME]).as_bytes()).await;
    let b = second.enroll(csr(&[LEAF_NAME]).as_bytes()).await;

    assert_eq!(a.error, None);
    assert_eq!(a, b);
    assert_eq!(ca.calls("create"), 1);
}

/// Cache store whose every operation fails.
#[derive(Debug)]
struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &str) -> zerossl_handler::Result<Option<String>> {
        Err(HandlerError::Cache("connection refused".into()))
    }

    async fn set_ex(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> zerossl_handler::Result<()> {
        Err(HandlerError::Cache("connection refused".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_cache_store_does_not_fail_enrollment() {
    let ca = Arc::new(ScriptedCa::new(single_validation()));
    let dns = Arc::new(RecordingDns::new());
    let handler = ZeroSslHandler::builder(ca.clone(), dns.clone())
        .cache(PrefetchCache::with_store(
            Duration::from_secs(60),
            Arc::new(BrokenStore),
        ))
        .build();
    let request = csr(&[LEAF_NAME]);

    let first = handler.enroll(request.as_bytes()).await;
    let second = handler.enroll(request.as_bytes()).await;

    assert_eq!(first.error, None);
    assert_eq!(second.error, None);
    assert_eq!(ca.calls("create"), 2);
}
