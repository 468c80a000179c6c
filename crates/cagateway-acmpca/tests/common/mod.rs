//! Common test utilities for cagateway-acmpca integration tests.
//!
//! In-memory stand-ins for ACM PCA, the audit report bucket and the host's
//! certificate store, plus certificate and audit report factories.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rcgen::{CertificateParams, DnType, ExtendedKeyUsagePurpose, KeyPair};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};

use cagateway_acmpca::{
    AcmPcaConfig, AcmPcaConnector, AuditReportHandle, AuditReportStatus, Backend, BackendFactory,
    IssueRequest, NativeRevocationReason, PcaApi, ProductTemplateMap, ReportStore,
};
use cagateway_connector::prelude::*;

pub const CA_ARN: &str =
    "arn:aws:acm-pca:us-east-1:123456789012:certificate-authority/0f3c7d2e-5a1b-4c8d-9e6f-1a2b3c4d5e6f";
pub const BUCKET: &str = "cagateway-audit-reports";
pub const AUDIT_KEY: &str = "audit-report/0f3c7d2e/latest.json";

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// ARN of a certificate issued by the test CA.
pub fn certificate_arn(id: &str) -> String {
    format!("{CA_ARN}/certificate/{id}")
}

/// `notBefore` stamped on every generated certificate.
pub fn not_before() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
}

/// Self-signed end-entity certificate with the given extended key usages.
///
/// An empty list omits the extension entirely.
pub fn certificate_pem(usages: &[ExtendedKeyUsagePurpose]) -> String {
    let mut params = CertificateParams::new(vec!["device.example.com".to_string()]).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, "device.example.com");
    params.extended_key_usages = usages.to_vec();
    params.not_before = rcgen::date_time_ymd(2024, 1, 15);
    params.not_after = rcgen::date_time_ymd(2025, 1, 15);
    let key_pair = KeyPair::generate().unwrap();
    params.self_signed(&key_pair).unwrap().pem()
}

pub fn server_auth_pem() -> String {
    certificate_pem(&[ExtendedKeyUsagePurpose::ServerAuth])
}

pub fn client_auth_pem() -> String {
    certificate_pem(&[ExtendedKeyUsagePurpose::ClientAuth])
}

pub fn test_csr() -> String {
    "-----BEGIN CERTIFICATE REQUEST-----\nMIIBtest\n-----END CERTIFICATE REQUEST-----\n"
        .to_string()
}

/// Audit report row for an issued certificate.
pub fn audit_entry(arn: &str) -> Value {
    json!({
        "awsAccountId": "123456789012",
        "certificateArn": arn,
        "serial": "4c:1f:00:aa",
        "subject": "CN=device.example.com",
        "notBefore": "2024-01-15T00:00:00+0000",
        "notAfter": "2025-01-15T00:00:00+0000",
        "issuedAt": "2024-01-15T00:00:01+0000",
        "templateArn": "arn:aws:acm-pca:::template/EndEntityCertificate/V1"
    })
}

/// Audit report row for a revoked certificate.
pub fn revoked_audit_entry(arn: &str, revoked_at: &str, reason: &str) -> Value {
    let mut entry = audit_entry(arn);
    entry["revokedAt"] = json!(revoked_at);
    entry["revocationReason"] = json!(reason);
    entry
}

pub fn test_config() -> AcmPcaConfig {
    AcmPcaConfig::new("AKIATESTACCESSKEY", "test-secret", CA_ARN, BUCKET)
}

/// Connection info as the host would store it.
pub fn connection_info() -> ConnectionInfo {
    let mut info = ConnectionInfo::new();
    info.insert("AccessKey".to_string(), json!("AKIATESTACCESSKEY"));
    info.insert("AccessSecret".to_string(), json!("test-secret"));
    info.insert("Region".to_string(), json!("us-east-1"));
    info.insert("CAARN".to_string(), json!(CA_ARN));
    info.insert("S3Bucket".to_string(), json!(BUCKET));
    info
}

#[derive(Default)]
struct PcaState {
    certificates: HashMap<String, Option<String>>,
    in_progress: HashMap<String, u32>,
    failing: Vec<String>,
    fetches: HashMap<String, u32>,
    issuance_queue: VecDeque<(String, u32)>,
    issued: Vec<IssueRequest>,
    ca_status: Option<String>,
    revocations: Vec<(String, NativeRevocationReason)>,
    audit_statuses: VecDeque<AuditReportStatus>,
    audit_status_polls: u32,
    audit_create_fails: bool,
    reports_created: u32,
}

/// In-memory ACM PCA.
pub struct FakePca {
    state: Mutex<PcaState>,
}

impl Default for FakePca {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePca {
    pub fn new() -> Self {
        let state = PcaState {
            ca_status: Some("ACTIVE".to_string()),
            ..PcaState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Register an issued certificate.
    pub fn add_certificate(&self, arn: &str, pem: &str) {
        self.state
            .lock()
            .unwrap()
            .certificates
            .insert(arn.to_string(), Some(pem.to_string()));
    }

    /// Register a certificate the CA answers with an empty body.
    pub fn add_empty_certificate(&self, arn: &str) {
        self.state
            .lock()
            .unwrap()
            .certificates
            .insert(arn.to_string(), None);
    }

    /// Answer "still being issued" for the next `polls` fetches of `arn`.
    pub fn set_in_progress(&self, arn: &str, polls: u32) {
        self.state
            .lock()
            .unwrap()
            .in_progress
            .insert(arn.to_string(), polls);
    }

    /// Fail every fetch of `arn` with a remote error.
    pub fn fail_certificate(&self, arn: &str) {
        self.state.lock().unwrap().failing.push(arn.to_string());
    }

    /// Certificate the next issuance produces, and how many fetches report
    /// it as in progress.
    pub fn queue_issuance(&self, pem: &str, in_progress_polls: u32) {
        self.state
            .lock()
            .unwrap()
            .issuance_queue
            .push_back((pem.to_string(), in_progress_polls));
    }

    pub fn set_ca_status(&self, status: &str) {
        self.state.lock().unwrap().ca_status = Some(status.to_string());
    }

    /// Make the CA unreachable.
    pub fn set_unreachable(&self) {
        self.state.lock().unwrap().ca_status = None;
    }

    /// Statuses reported for the next audit report polls; `SUCCESS` afterwards.
    pub fn queue_audit_statuses(&self, statuses: &[AuditReportStatus]) {
        self.state
            .lock()
            .unwrap()
            .audit_statuses
            .extend(statuses.iter().copied());
    }

    pub fn fail_audit_reports(&self) {
        self.state.lock().unwrap().audit_create_fails = true;
    }

    pub fn fetch_count(&self, arn: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .fetches
            .get(arn)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> u32 {
        self.state.lock().unwrap().fetches.values().sum()
    }

    pub fn issued(&self) -> Vec<IssueRequest> {
        self.state.lock().unwrap().issued.clone()
    }

    pub fn revocations(&self) -> Vec<(String, NativeRevocationReason)> {
        self.state.lock().unwrap().revocations.clone()
    }

    pub fn reports_created(&self) -> u32 {
        self.state.lock().unwrap().reports_created
    }

    pub fn audit_status_polls(&self) -> u32 {
        self.state.lock().unwrap().audit_status_polls
    }
}

#[async_trait]
impl PcaApi for FakePca {
    async fn issue_certificate(&self, request: &IssueRequest) -> ConnectorResult<String> {
        let mut state = self.state.lock().unwrap();
        let (pem, polls) = state
            .issuance_queue
            .pop_front()
            .ok_or_else(|| ConnectorError::remote("LimitExceededException"))?;

        state.issued.push(request.clone());
        let arn = certificate_arn(&format!("{:032x}", state.issued.len()));
        state.certificates.insert(arn.clone(), Some(pem));
        state.in_progress.insert(arn.clone(), polls);
        Ok(arn)
    }

    async fn get_certificate(&self, certificate_arn: &str) -> ConnectorResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        *state
            .fetches
            .entry(certificate_arn.to_string())
            .or_default() += 1;

        if state.failing.iter().any(|arn| arn == certificate_arn) {
            return Err(ConnectorError::remote("ThrottlingException"));
        }

        if let Some(remaining) = state.in_progress.get_mut(certificate_arn) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ConnectorError::RequestInProgress {
                    certificate_arn: certificate_arn.to_string(),
                });
            }
        }

        match state.certificates.get(certificate_arn) {
            Some(body) => Ok(body.clone()),
            None => Err(ConnectorError::remote("ResourceNotFoundException")),
        }
    }

    async fn certificate_authority_status(&self) -> ConnectorResult<String> {
        self.state
            .lock()
            .unwrap()
            .ca_status
            .clone()
            .ok_or_else(|| ConnectorError::remote("connection refused"))
    }

    async fn revoke_certificate(
        &self,
        serial: &str,
        reason: NativeRevocationReason,
    ) -> ConnectorResult<()> {
        self.state
            .lock()
            .unwrap()
            .revocations
            .push((serial.to_string(), reason));
        Ok(())
    }

    async fn create_audit_report(&self, bucket: &str) -> ConnectorResult<AuditReportHandle> {
        let mut state = self.state.lock().unwrap();
        if state.audit_create_fails || bucket != BUCKET {
            return Err(ConnectorError::remote("AccessDenied"));
        }
        state.reports_created += 1;
        Ok(AuditReportHandle {
            report_id: format!("report-{}", state.reports_created),
            s3_key: AUDIT_KEY.to_string(),
        })
    }

    async fn audit_report_status(&self, _report_id: &str) -> ConnectorResult<AuditReportStatus> {
        let mut state = self.state.lock().unwrap();
        state.audit_status_polls += 1;
        Ok(state
            .audit_statuses
            .pop_front()
            .unwrap_or(AuditReportStatus::Success))
    }
}

/// In-memory audit report bucket.
#[derive(Default)]
pub struct FakeReportStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeReportStore {
    /// Deliver an audit report built from `entries`.
    pub fn put_report(&self, entries: Vec<Value>) {
        self.put_raw(serde_json::to_vec(&Value::Array(entries)).unwrap());
    }

    pub fn put_raw(&self, document: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(AUDIT_KEY.to_string(), document);
    }
}

#[async_trait]
impl ReportStore for FakeReportStore {
    async fn get_object(&self, bucket: &str, key: &str) -> ConnectorResult<Vec<u8>> {
        if bucket != BUCKET {
            return Err(ConnectorError::remote(format!("NoSuchBucket: {bucket}")));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ConnectorError::remote(format!("NoSuchKey: {key}")))
    }
}

/// Factory handing out fakes, one `FakePca` per CA ARN.
pub struct FakeFactory {
    default_pca: Arc<FakePca>,
    other_cas: Mutex<HashMap<String, Arc<FakePca>>>,
    reports: Arc<FakeReportStore>,
    builds: Mutex<Vec<String>>,
}

impl FakeFactory {
    pub fn new(pca: Arc<FakePca>, reports: Arc<FakeReportStore>) -> Self {
        Self {
            default_pca: pca,
            other_cas: Mutex::new(HashMap::new()),
            reports,
            builds: Mutex::new(Vec::new()),
        }
    }

    /// Serve `pca` for connections to `ca_arn`.
    pub fn add_ca(&self, ca_arn: &str, pca: Arc<FakePca>) {
        self.other_cas
            .lock()
            .unwrap()
            .insert(ca_arn.to_string(), pca);
    }

    /// CA ARNs backends were built for, in order.
    pub fn builds(&self) -> Vec<String> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendFactory for FakeFactory {
    async fn build(&self, config: &AcmPcaConfig) -> ConnectorResult<Backend> {
        self.builds.lock().unwrap().push(config.ca_arn.clone());
        let pca: Arc<dyn PcaApi> = self
            .other_cas
            .lock()
            .unwrap()
            .get(&config.ca_arn)
            .cloned()
            .unwrap_or_else(|| self.default_pca.clone());
        Ok(Backend {
            pca,
            reports: self.reports.clone(),
        })
    }
}

/// Host certificate store keyed by CA request id.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CertificateRecord>>,
}

impl MemoryStore {
    /// Persist records the way the host would after a sync pass.
    pub fn apply(&self, records: impl IntoIterator<Item = CertificateRecord>) {
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.insert(record.ca_request_id.clone(), record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl CertificateDataReader for MemoryStore {
    async fn certificate_record(&self, ca_request_id: &str) -> Option<CertificateRecord> {
        self.records.lock().unwrap().get(ca_request_id).cloned()
    }
}

/// A connector wired to fakes.
pub struct Harness {
    pub pca: Arc<FakePca>,
    pub reports: Arc<FakeReportStore>,
    pub factory: Arc<FakeFactory>,
    pub connector: AcmPcaConnector,
}

pub async fn harness() -> Harness {
    harness_with_templates(ProductTemplateMap::default()).await
}

pub async fn harness_with_templates(templates: ProductTemplateMap) -> Harness {
    init_test_logging();

    let pca = Arc::new(FakePca::new());
    let reports = Arc::new(FakeReportStore::default());
    let factory = Arc::new(FakeFactory::new(pca.clone(), reports.clone()));
    let connector = AcmPcaConnector::with_factory(test_config(), templates, factory.clone())
        .await
        .expect("connector should initialize against fakes");

    Harness {
        pca,
        reports,
        factory,
        connector,
    }
}
