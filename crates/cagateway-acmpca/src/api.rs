//! Remote seams of the connector.
//!
//! [`PcaApi`] covers the ACM PCA operations the connector sequences and
//! [`ReportStore`] the object storage audit reports are delivered to. The AWS
//! SDK implementations live in [`crate::aws`]; tests substitute in-memory
//! fakes.

use async_trait::async_trait;
use std::sync::Arc;

use cagateway_connector::error::ConnectorResult;

use crate::config::AcmPcaConfig;
use crate::revocation::NativeRevocationReason;

/// Parameters of one `IssueCertificate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    /// PEM-armoured CSR, as bytes.
    pub csr: Vec<u8>,
    pub template_arn: String,
    pub validity_days: i64,
    /// ACM PCA signing algorithm name, e.g. `SHA256WITHRSA`.
    pub signing_algorithm: String,
}

/// Audit report job handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReportHandle {
    pub report_id: String,
    /// Object key the report is delivered under.
    pub s3_key: String,
}

/// Generation state of an audit report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditReportStatus {
    Creating,
    Success,
    Failed,
}

impl AuditReportStatus {
    /// Map the wire value; anything unrecognised is still in progress.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            _ => Self::Creating,
        }
    }
}

/// ACM PCA operations for a single certificate authority.
#[async_trait]
pub trait PcaApi: Send + Sync {
    /// Submit a CSR and return the new certificate's ARN.
    async fn issue_certificate(&self, request: &IssueRequest) -> ConnectorResult<String>;

    /// Fetch a certificate PEM.
    ///
    /// Fails with `RequestInProgress` while the CA is still issuing and
    /// returns `None` when the CA answers with an empty body.
    async fn get_certificate(&self, certificate_arn: &str) -> ConnectorResult<Option<String>>;

    /// Current CA status, e.g. `ACTIVE`.
    async fn certificate_authority_status(&self) -> ConnectorResult<String>;

    async fn revoke_certificate(
        &self,
        serial: &str,
        reason: NativeRevocationReason,
    ) -> ConnectorResult<()>;

    /// Start a JSON audit report delivered to `bucket`.
    async fn create_audit_report(&self, bucket: &str) -> ConnectorResult<AuditReportHandle>;

    async fn audit_report_status(&self, report_id: &str) -> ConnectorResult<AuditReportStatus>;
}

/// Read access to the bucket audit reports land in.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> ConnectorResult<Vec<u8>>;
}

/// A connected pair of remote seams.
#[derive(Clone)]
pub struct Backend {
    pub pca: Arc<dyn PcaApi>,
    pub reports: Arc<dyn ReportStore>,
}

/// Builds remote seams from connection parameters.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn build(&self, config: &AcmPcaConfig) -> ConnectorResult<Backend>;
}
