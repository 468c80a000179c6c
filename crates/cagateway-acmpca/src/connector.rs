//! ACM Private CA connector.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use cagateway_connector::config::{connection_field, ConnectionInfo, ConnectorConfig};
use cagateway_connector::error::{ConnectorError, ConnectorResult};
use cagateway_connector::record::{
    CertificateRecord, EnrollmentProductInfo, EnrollmentRequest, RequestDisposition,
};
use cagateway_connector::traits::{CaConnector, CertificateDataReader, RecordStream};

use crate::api::BackendFactory;
use crate::aws::AwsBackendFactory;
use crate::client::AcmPcaClient;
use crate::config::{
    AcmPcaConfig, ProductTemplateMap, ACCESS_KEY, ACCESS_SECRET, CA_ARN, DEFAULT_VALIDITY_DAYS,
    LIFETIME_DAYS_PARAMETER, REGION, S3_BUCKET,
};
use crate::region::{self, RegionEndpoint};
use crate::sync::SyncReconciler;

const DISPLAY_NAME: &str = "AWS ACM Private CA";

/// Connector for AWS Certificate Manager Private CA.
pub struct AcmPcaConnector {
    client: AcmPcaClient,
    templates: ProductTemplateMap,
    factory: Arc<dyn BackendFactory>,
}

impl std::fmt::Debug for AcmPcaConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcmPcaConnector")
            .field("client", &self.client)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl AcmPcaConnector {
    /// Connect with the AWS SDK and the default product templates.
    pub async fn new(config: AcmPcaConfig) -> ConnectorResult<Self> {
        Self::with_factory(
            config,
            ProductTemplateMap::default(),
            Arc::new(AwsBackendFactory),
        )
        .await
    }

    /// Connect from the host's stored connection info.
    pub async fn from_connection_info(info: &ConnectionInfo) -> ConnectorResult<Self> {
        Self::new(AcmPcaConfig::from_connection_info(info)?).await
    }

    /// Connect with explicit product templates and backend factory.
    pub async fn with_factory(
        config: AcmPcaConfig,
        templates: ProductTemplateMap,
        factory: Arc<dyn BackendFactory>,
    ) -> ConnectorResult<Self> {
        config.validate()?;
        let backend = factory.build(&config).await?;

        info!(
            ca_arn = %config.ca_arn,
            products = templates.len(),
            "ACM PCA connector initialized"
        );

        Ok(Self {
            client: AcmPcaClient::new(config, backend),
            templates,
            factory,
        })
    }

    pub fn config(&self) -> &AcmPcaConfig {
        self.client.config()
    }

    pub fn client(&self) -> &AcmPcaClient {
        &self.client
    }

    pub fn templates(&self) -> &ProductTemplateMap {
        &self.templates
    }

    /// Health-check connection data other than the running configuration.
    async fn check_connection(&self, info: &ConnectionInfo) -> ConnectorResult<()> {
        let config = AcmPcaConfig::from_connection_info(info)?;
        let backend = self.factory.build(&config).await?;
        AcmPcaClient::new(config, backend).verify_health().await
    }
}

/// Requested validity from the product parameters.
fn lifetime_days(product: &EnrollmentProductInfo) -> ConnectorResult<i64> {
    let Some(raw) = product.product_parameters.get(LIFETIME_DAYS_PARAMETER) else {
        return Ok(DEFAULT_VALIDITY_DAYS);
    };

    match raw.trim().parse::<i64>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(ConnectorError::invalid_data(format!(
            "{LIFETIME_DAYS_PARAMETER} must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Serial to revoke: the last path segment of the request id, or the
/// caller-supplied serial when the id has none.
fn revocation_serial<'a>(ca_request_id: &'a str, hex_serial: &'a str) -> &'a str {
    ca_request_id
        .rsplit_once('/')
        .map(|(_, serial)| serial)
        .filter(|serial| !serial.is_empty())
        .unwrap_or(hex_serial)
}

#[async_trait]
impl CaConnector for AcmPcaConnector {
    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    #[instrument(skip(self, request), fields(product_id = %request.product.product_id))]
    async fn enroll(&self, request: &EnrollmentRequest) -> ConnectorResult<CertificateRecord> {
        let template_arn = self.templates.require(&request.product.product_id)?;
        let validity_days = lifetime_days(&request.product)?;
        debug!(
            enrollment_type = ?request.enrollment_type,
            validity_days,
            "Submitting enrollment"
        );

        let certificate_arn = self
            .client
            .issue(request.csr.as_bytes(), template_arn, validity_days)
            .await?;
        let record = self.client.fetch_by_arn(&certificate_arn).await?;

        info!(
            certificate_arn = %record.ca_request_id,
            product = %record.product_id,
            "Enrollment completed"
        );
        Ok(record)
    }

    async fn get_single_record(&self, ca_request_id: &str) -> ConnectorResult<CertificateRecord> {
        let certificate_arn = self.client.certificate_arn_for(ca_request_id);
        self.client.fetch_by_arn(&certificate_arn).await
    }

    async fn ping(&self) -> ConnectorResult<()> {
        self.client.verify_health().await
    }

    #[instrument(skip(self))]
    async fn revoke(
        &self,
        ca_request_id: &str,
        hex_serial: &str,
        reason_code: u32,
    ) -> ConnectorResult<RequestDisposition> {
        let serial = revocation_serial(ca_request_id, hex_serial);
        self.client.revoke(serial, reason_code).await
    }

    #[instrument(skip(self, reader, cancel))]
    async fn synchronize<'a>(
        &'a self,
        reader: &'a dyn CertificateDataReader,
        full_sync: bool,
        cancel: CancellationToken,
    ) -> ConnectorResult<RecordStream<'a>> {
        let inventory = self.client.fetch_audit_inventory(&cancel).await?;
        Ok(SyncReconciler::new(reader, &self.client, full_sync, cancel).reconcile(inventory))
    }

    #[instrument(skip(self, info))]
    async fn validate_connection_info(&self, info: &ConnectionInfo) -> ConnectorResult<()> {
        let mut errors = Vec::new();

        for key in [ACCESS_KEY, ACCESS_SECRET, REGION, CA_ARN, S3_BUCKET] {
            if connection_field(info, key).is_none() {
                errors.push(format!("{key} is required"));
            }
        }

        if let Some(region) = connection_field(info, REGION) {
            if RegionEndpoint::by_system_name(region).is_none() {
                errors.push("Unknown region specified".to_string());
            }
        }

        if let Some(ca_arn) = connection_field(info, CA_ARN) {
            if let Err(e) = region::resolve(ca_arn) {
                errors.push(format!("Invalid {CA_ARN}: {e}"));
            }
        }

        // Incomplete data surfaces here as a failed connection
        if let Err(e) = self.check_connection(info).await {
            errors.push(format!("Unable to connect to ACM PCA: {e}"));
        }

        if errors.is_empty() {
            return Ok(());
        }

        warn!(problems = errors.len(), "Connection info failed validation");
        Err(ConnectorError::ValidationFailed { errors })
    }

    async fn validate_product_info(&self, product: &EnrollmentProductInfo) -> ConnectorResult<()> {
        self.templates.require(&product.product_id).map(|_| ())
    }
}
