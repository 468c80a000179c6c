//! ACM PCA client.
//!
//! Sequences the remote operations the connector needs and owns the polling
//! behaviour of eventually-consistent issuance and audit report delivery.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use cagateway_connector::error::{ConnectorError, ConnectorResult};
use cagateway_connector::record::{CertificateRecord, RequestDisposition};

use crate::api::{AuditReportStatus, Backend, IssueRequest, PcaApi, ReportStore};
use crate::audit::{self, AuditRecord};
use crate::classify::inspect_certificate;
use crate::config::AcmPcaConfig;
use crate::revocation;
use crate::sync::CertificateSource;

/// Certificate status reported by a CA that can issue.
pub const CA_STATUS_ACTIVE: &str = "ACTIVE";

/// Signing algorithm requested for every issuance.
pub const SIGNING_ALGORITHM: &str = "SHA256WITHRSA";

/// Client for one ACM Private CA.
#[derive(Clone)]
pub struct AcmPcaClient {
    config: AcmPcaConfig,
    pca: Arc<dyn PcaApi>,
    reports: Arc<dyn ReportStore>,
}

impl std::fmt::Debug for AcmPcaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcmPcaClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AcmPcaClient {
    pub fn new(config: AcmPcaConfig, backend: Backend) -> Self {
        Self {
            config,
            pca: backend.pca,
            reports: backend.reports,
        }
    }

    pub fn config(&self) -> &AcmPcaConfig {
        &self.config
    }

    /// Full certificate ARN for a request id.
    ///
    /// Bare certificate ids are expanded under the configured CA.
    #[must_use]
    pub fn certificate_arn_for(&self, request_id: &str) -> String {
        if request_id.starts_with("arn:") {
            request_id.to_string()
        } else {
            self.config.certificate_arn(request_id)
        }
    }

    /// Submit a CSR and return the certificate ARN.
    ///
    /// Issuance is asynchronous: the ARN may not be fetchable yet.
    #[instrument(skip(self, csr))]
    pub async fn issue(
        &self,
        csr: &[u8],
        template_arn: &str,
        validity_days: i64,
    ) -> ConnectorResult<String> {
        let request = IssueRequest {
            csr: csr.to_vec(),
            template_arn: template_arn.to_string(),
            validity_days,
            signing_algorithm: SIGNING_ALGORITHM.to_string(),
        };

        let certificate_arn = self.pca.issue_certificate(&request).await.map_err(|e| {
            error!(error = %e, "Certificate issuance failed");
            e
        })?;

        debug!(certificate_arn = %certificate_arn, "Certificate issuance accepted");
        Ok(certificate_arn)
    }

    /// Fetch and classify a certificate, waiting for issuance to finish.
    ///
    /// Retries for as long as the CA reports the certificate as in progress.
    pub async fn fetch_by_arn(&self, certificate_arn: &str) -> ConnectorResult<CertificateRecord> {
        self.fetch(certificate_arn, None).await
    }

    /// Like [`fetch_by_arn`](Self::fetch_by_arn), but gives up with
    /// `Cancelled` once `cancel` fires.
    pub async fn fetch_by_arn_cancellable(
        &self,
        certificate_arn: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<CertificateRecord> {
        self.fetch(certificate_arn, Some(cancel)).await
    }

    #[instrument(skip(self, cancel))]
    async fn fetch(
        &self,
        certificate_arn: &str,
        cancel: Option<&CancellationToken>,
    ) -> ConnectorResult<CertificateRecord> {
        let interval = self.config.polling.certificate_poll_interval();
        let mut attempts: u32 = 0;

        let certificate_pem = loop {
            attempts = attempts.saturating_add(1);
            match self.pca.get_certificate(certificate_arn).await {
                Ok(Some(pem)) => break pem,
                Ok(None) => {
                    return Err(ConnectorError::NotFound {
                        identifier: certificate_arn.to_string(),
                    })
                }
                Err(ConnectorError::RequestInProgress { .. }) => {
                    debug!(attempts, "Certificate still being issued, retrying");
                    pause(interval, cancel).await?;
                }
                Err(e) => {
                    error!(error = %e, "Failed to fetch certificate");
                    return Err(e);
                }
            }
        };

        let details = inspect_certificate(&certificate_pem)?;
        debug!(product = %details.product, attempts, "Certificate fetched");

        Ok(CertificateRecord::issued(
            certificate_arn,
            details.body,
            details.product.as_str(),
            details.not_before,
        ))
    }

    /// Check that the CA is reachable and `ACTIVE`.
    #[instrument(skip(self), fields(ca_arn = %self.config.ca_arn))]
    pub async fn verify_health(&self) -> ConnectorResult<()> {
        let status = self.pca.certificate_authority_status().await.map_err(|e| {
            error!(error = %e, "Unable to reach certificate authority");
            e
        })?;

        if status != CA_STATUS_ACTIVE {
            warn!(status = %status, "Certificate authority is not active");
            return Err(ConnectorError::CaNotActive { status });
        }

        debug!("Certificate authority is active");
        Ok(())
    }

    /// Revoke a certificate by serial.
    #[instrument(skip(self))]
    pub async fn revoke(&self, serial: &str, reason_code: u32) -> ConnectorResult<RequestDisposition> {
        let reason = revocation::to_native(reason_code);

        self.pca
            .revoke_certificate(serial, reason)
            .await
            .map_err(|e| {
                error!(error = %e, "Revocation failed");
                e
            })?;

        info!(reason = %reason, "Certificate revoked");
        Ok(RequestDisposition::Revoked)
    }

    /// Generate, download and parse an audit report of the CA's inventory.
    ///
    /// All-or-nothing: any failure along the way fails the whole call.
    #[instrument(skip(self, cancel), fields(bucket = %self.config.s3_bucket))]
    pub async fn fetch_audit_inventory(
        &self,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<AuditRecord>> {
        let bucket = &self.config.s3_bucket;
        let handle = self.pca.create_audit_report(bucket).await.map_err(|e| {
            error!(error = %e, "Failed to request audit report");
            e
        })?;
        debug!(report_id = %handle.report_id, s3_key = %handle.s3_key, "Audit report requested");

        self.wait_for_audit_report(&handle.report_id, cancel).await?;

        let document = self.reports.get_object(bucket, &handle.s3_key).await.map_err(|e| {
            error!(error = %e, s3_key = %handle.s3_key, "Failed to download audit report");
            e
        })?;

        let records = audit::parse_report(&document)?;
        info!(records = records.len(), "Audit inventory loaded");
        Ok(records)
    }

    async fn wait_for_audit_report(
        &self,
        report_id: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        let polling = &self.config.polling;

        for poll in 1..=polling.audit_max_polls {
            match self.pca.audit_report_status(report_id).await? {
                AuditReportStatus::Success => return Ok(()),
                AuditReportStatus::Failed => {
                    error!(report_id, "Audit report generation failed");
                    return Err(ConnectorError::remote(format!(
                        "audit report {report_id} failed"
                    )));
                }
                AuditReportStatus::Creating => {
                    debug!(report_id, poll, "Audit report still being generated");
                    if poll < polling.audit_max_polls {
                        pause(polling.audit_poll_interval(), Some(cancel)).await?;
                    }
                }
            }
        }

        warn!(
            report_id,
            polls = polling.audit_max_polls,
            "Gave up waiting for audit report"
        );
        Err(ConnectorError::remote(format!(
            "audit report {report_id} not delivered after {} polls",
            polling.audit_max_polls
        )))
    }
}

#[async_trait]
impl CertificateSource for AcmPcaClient {
    async fn fetch_full(
        &self,
        certificate_arn: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<CertificateRecord> {
        self.fetch_by_arn_cancellable(certificate_arn, cancel).await
    }
}

async fn pause(duration: Duration, cancel: Option<&CancellationToken>) -> ConnectorResult<()> {
    match cancel {
        Some(token) => tokio::select! {
            _ = token.cancelled() => Err(ConnectorError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        },
        None => {
            tokio::time::sleep(duration).await;
            Ok(())
        }
    }
}
