//! AWS SDK backends for ACM PCA and S3.

use async_trait::async_trait;
use aws_sdk_acmpca::primitives::Blob;
use aws_sdk_acmpca::types::{
    AuditReportResponseFormat, SigningAlgorithm, Validity, ValidityPeriodType,
};
use std::sync::Arc;

use cagateway_connector::error::{ConnectorError, ConnectorResult};

use crate::api::{
    AuditReportHandle, AuditReportStatus, Backend, BackendFactory, IssueRequest, PcaApi,
    ReportStore,
};
use crate::config::AcmPcaConfig;
use crate::revocation::NativeRevocationReason;

const CREDENTIALS_PROVIDER: &str = "cagateway-acmpca-explicit";

/// Load an SDK config for the CA's region with the connection credentials.
pub async fn load_sdk_config(config: &AcmPcaConfig) -> ConnectorResult<aws_config::SdkConfig> {
    let endpoint = config.region_endpoint()?;

    let creds = aws_sdk_acmpca::config::Credentials::new(
        &config.access_key,
        &config.access_secret,
        None, // session token
        None, // expiry
        CREDENTIALS_PROVIDER,
    );

    let sdk_config = aws_config::from_env()
        .region(endpoint.sdk_region())
        .credentials_provider(creds)
        .load()
        .await;

    tracing::info!(
        region = endpoint.system_name,
        ca_arn = %config.ca_arn,
        "AWS SDK configuration loaded"
    );

    Ok(sdk_config)
}

/// ACM PCA client bound to one certificate authority.
#[derive(Debug, Clone)]
pub struct AwsPcaApi {
    client: aws_sdk_acmpca::Client,
    ca_arn: String,
}

impl AwsPcaApi {
    pub fn new(sdk_config: &aws_config::SdkConfig, ca_arn: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_acmpca::Client::new(sdk_config),
            ca_arn: ca_arn.into(),
        }
    }
}

#[async_trait]
impl PcaApi for AwsPcaApi {
    async fn issue_certificate(&self, request: &IssueRequest) -> ConnectorResult<String> {
        let validity = Validity::builder()
            .r#type(ValidityPeriodType::from("DAYS"))
            .value(request.validity_days)
            .build()
            .map_err(|e| ConnectorError::invalid_data(format!("invalid validity: {e}")))?;

        let output = self
            .client
            .issue_certificate()
            .certificate_authority_arn(&self.ca_arn)
            .csr(Blob::new(request.csr.clone()))
            .signing_algorithm(SigningAlgorithm::from(request.signing_algorithm.as_str()))
            .template_arn(&request.template_arn)
            .validity(validity)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::remote_with_source("IssueCertificate failed", e.into_service_error())
            })?;

        output
            .certificate_arn()
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::remote("IssueCertificate returned no certificate ARN"))
    }

    async fn get_certificate(&self, certificate_arn: &str) -> ConnectorResult<Option<String>> {
        let result = self
            .client
            .get_certificate()
            .certificate_authority_arn(&self.ca_arn)
            .certificate_arn(certificate_arn)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .certificate()
                .filter(|pem| !pem.trim().is_empty())
                .map(str::to_string)),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_request_in_progress_exception() {
                    Err(ConnectorError::RequestInProgress {
                        certificate_arn: certificate_arn.to_string(),
                    })
                } else {
                    Err(ConnectorError::remote_with_source(
                        format!("GetCertificate failed for {certificate_arn}"),
                        service_error,
                    ))
                }
            }
        }
    }

    async fn certificate_authority_status(&self) -> ConnectorResult<String> {
        let output = self
            .client
            .describe_certificate_authority()
            .certificate_authority_arn(&self.ca_arn)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::remote_with_source(
                    "DescribeCertificateAuthority failed",
                    e.into_service_error(),
                )
            })?;

        Ok(output
            .certificate_authority()
            .and_then(|ca| ca.status())
            .map(|status| status.as_str().to_string())
            .unwrap_or_default())
    }

    async fn revoke_certificate(
        &self,
        serial: &str,
        reason: NativeRevocationReason,
    ) -> ConnectorResult<()> {
        self.client
            .revoke_certificate()
            .certificate_authority_arn(&self.ca_arn)
            .certificate_serial(serial)
            .revocation_reason(reason.into())
            .send()
            .await
            .map_err(|e| {
                ConnectorError::remote_with_source("RevokeCertificate failed", e.into_service_error())
            })?;
        Ok(())
    }

    async fn create_audit_report(&self, bucket: &str) -> ConnectorResult<AuditReportHandle> {
        let output = self
            .client
            .create_certificate_authority_audit_report()
            .certificate_authority_arn(&self.ca_arn)
            .s3_bucket_name(bucket)
            .audit_report_response_format(AuditReportResponseFormat::from("JSON"))
            .send()
            .await
            .map_err(|e| {
                ConnectorError::remote_with_source(
                    "CreateCertificateAuthorityAuditReport failed",
                    e.into_service_error(),
                )
            })?;

        match (output.audit_report_id(), output.s3_key()) {
            (Some(report_id), Some(s3_key)) => Ok(AuditReportHandle {
                report_id: report_id.to_string(),
                s3_key: s3_key.to_string(),
            }),
            _ => Err(ConnectorError::remote(
                "audit report request returned no report id or key",
            )),
        }
    }

    async fn audit_report_status(&self, report_id: &str) -> ConnectorResult<AuditReportStatus> {
        let output = self
            .client
            .describe_certificate_authority_audit_report()
            .certificate_authority_arn(&self.ca_arn)
            .audit_report_id(report_id)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::remote_with_source(
                    "DescribeCertificateAuthorityAuditReport failed",
                    e.into_service_error(),
                )
            })?;

        Ok(output
            .audit_report_status()
            .map(|status| AuditReportStatus::from_wire(status.as_str()))
            .unwrap_or(AuditReportStatus::Creating))
    }
}

/// S3 reader that follows each bucket to its own region.
#[derive(Debug, Clone)]
pub struct S3ReportStore {
    sdk_config: aws_config::SdkConfig,
}

impl S3ReportStore {
    pub fn new(sdk_config: aws_config::SdkConfig) -> Self {
        Self { sdk_config }
    }
}

/// Region of a bucket from its location constraint.
///
/// Buckets in `us-east-1` report no constraint; old `eu-west-1` buckets
/// report `EU`.
#[must_use]
pub fn bucket_region(location_constraint: Option<&str>) -> &str {
    match location_constraint {
        None | Some("") => "us-east-1",
        Some("EU") => "eu-west-1",
        Some(region) => region,
    }
}

#[async_trait]
impl ReportStore for S3ReportStore {
    async fn get_object(&self, bucket: &str, key: &str) -> ConnectorResult<Vec<u8>> {
        let client = aws_sdk_s3::Client::new(&self.sdk_config);
        let location = client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::remote_with_source(
                    format!("GetBucketLocation failed for {bucket}"),
                    e.into_service_error(),
                )
            })?;

        let region = bucket_region(location.location_constraint().map(|c| c.as_str())).to_string();
        tracing::debug!(bucket, region = %region, "Resolved audit bucket region");

        let regional_config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
            .region(aws_sdk_s3::config::Region::new(region))
            .build();
        let regional = aws_sdk_s3::Client::from_conf(regional_config);

        let object = regional
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::remote_with_source(
                    format!("GetObject failed for s3://{bucket}/{key}"),
                    e.into_service_error(),
                )
            })?;

        let bytes = object.body.collect().await.map_err(|e| {
            ConnectorError::remote_with_source(format!("failed to read s3://{bucket}/{key}"), e)
        })?;
        Ok(bytes.into_bytes().to_vec())
    }
}

/// Builds AWS SDK backends from connection parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsBackendFactory;

#[async_trait]
impl BackendFactory for AwsBackendFactory {
    async fn build(&self, config: &AcmPcaConfig) -> ConnectorResult<Backend> {
        let sdk_config = load_sdk_config(config).await?;
        Ok(Backend {
            pca: Arc::new(AwsPcaApi::new(&sdk_config, config.ca_arn.clone())),
            reports: Arc::new(S3ReportStore::new(sdk_config)),
        })
    }
}
