//! Connector Framework error types
//!
//! Error definitions with transient/permanent classification.

use thiserror::Error;

/// Error that can occur during connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Identifier and configuration errors (permanent)
    /// CA identifier does not have the expected colon-delimited shape.
    #[error("malformed CA identifier '{identifier}': {message}")]
    MalformedIdentifier { identifier: String, message: String },

    /// Region token of a CA identifier is not a known endpoint.
    #[error("unknown endpoint '{region}'")]
    UnknownEndpoint { region: String },

    /// Product id has no template mapping.
    #[error("product id '{product_id}' not recognized")]
    UnknownProduct { product_id: String },

    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Connection info failed validation. Carries every problem found.
    #[error("validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    // Certificate authority errors
    /// Certificate does not exist or the CA returned an empty body.
    #[error("certificate not found: {identifier}")]
    NotFound { identifier: String },

    /// CA exists but is not in the ACTIVE state.
    #[error("certificate authority is not active (current status: {status})")]
    CaNotActive { status: String },

    /// CA is still issuing the certificate; the identifier is not queryable yet.
    #[error("certificate {certificate_arn} is still being issued")]
    RequestInProgress { certificate_arn: String },

    /// Any fault reported by the remote CA or its storage.
    #[error("remote error: {message}")]
    Remote {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Data could not be decoded.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// The host's cancellation signal was observed.
    #[error("operation cancelled")]
    Cancelled,
}

impl ConnectorError {
    /// Check if this error is transient and the operation may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::Remote { .. } | ConnectorError::RequestInProgress { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::MalformedIdentifier { .. } => "MALFORMED_IDENTIFIER",
            ConnectorError::UnknownEndpoint { .. } => "UNKNOWN_ENDPOINT",
            ConnectorError::UnknownProduct { .. } => "UNKNOWN_PRODUCT",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::ValidationFailed { .. } => "VALIDATION_FAILED",
            ConnectorError::NotFound { .. } => "NOT_FOUND",
            ConnectorError::CaNotActive { .. } => "CA_NOT_ACTIVE",
            ConnectorError::RequestInProgress { .. } => "REQUEST_IN_PROGRESS",
            ConnectorError::Remote { .. } => "REMOTE_ERROR",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
            ConnectorError::Cancelled => "CANCELLED",
        }
    }

    /// Validation problems carried by [`ConnectorError::ValidationFailed`].
    ///
    /// Empty for every other variant.
    pub fn validation_errors(&self) -> &[String] {
        match self {
            ConnectorError::ValidationFailed { errors } => errors,
            _ => &[],
        }
    }

    // Convenience constructors

    /// Create a remote error.
    pub fn remote(message: impl Into<String>) -> Self {
        ConnectorError::Remote {
            message: message.into(),
            source: None,
        }
    }

    /// Create a remote error with source.
    pub fn remote_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Remote {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
