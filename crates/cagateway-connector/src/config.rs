//! Connector Framework configuration types
//!
//! Connection info supplied by the host and the trait connector-specific
//! configuration implements.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

use crate::error::{ConnectorError, ConnectorResult};

/// Connection data as the host stores it: a flat JSON object.
pub type ConnectionInfo = HashMap<String, serde_json::Value>;

/// Read a non-blank string field from connection info.
///
/// Missing keys, non-string values and whitespace-only strings all read as
/// `None`.
pub fn connection_field<'a>(info: &'a ConnectionInfo, key: &str) -> Option<&'a str> {
    info.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Trait for connector-specific configuration.
pub trait ConnectorConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Validate the configuration.
    fn validate(&self) -> ConnectorResult<()>;

    /// Create a redacted version of this config (for logging/display).
    fn redacted(&self) -> Self;

    /// Deserialize from host connection info and validate.
    fn from_connection_info(info: &ConnectionInfo) -> ConnectorResult<Self> {
        let value = serde_json::to_value(info).map_err(|e| {
            ConnectorError::invalid_configuration(format!("unreadable connection info: {e}"))
        })?;
        let config: Self = serde_json::from_value(value).map_err(|e| {
            ConnectorError::invalid_configuration(format!("invalid connection info: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }
}
