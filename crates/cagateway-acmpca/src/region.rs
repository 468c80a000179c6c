//! Region resolution from CA ARNs.

use aws_config::Region;
use cagateway_connector::error::{ConnectorError, ConnectorResult};

/// A known AWS regional endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionEndpoint {
    /// System name as it appears in ARNs, e.g. `us-east-1`.
    pub system_name: &'static str,
    /// Human-readable name.
    pub display_name: &'static str,
}

const fn endpoint(system_name: &'static str, display_name: &'static str) -> RegionEndpoint {
    RegionEndpoint {
        system_name,
        display_name,
    }
}

static REGION_ENDPOINTS: &[RegionEndpoint] = &[
    endpoint("us-east-1", "US East (N. Virginia)"),
    endpoint("us-east-2", "US East (Ohio)"),
    endpoint("us-west-1", "US West (N. California)"),
    endpoint("us-west-2", "US West (Oregon)"),
    endpoint("af-south-1", "Africa (Cape Town)"),
    endpoint("ap-east-1", "Asia Pacific (Hong Kong)"),
    endpoint("ap-south-1", "Asia Pacific (Mumbai)"),
    endpoint("ap-south-2", "Asia Pacific (Hyderabad)"),
    endpoint("ap-southeast-1", "Asia Pacific (Singapore)"),
    endpoint("ap-southeast-2", "Asia Pacific (Sydney)"),
    endpoint("ap-southeast-3", "Asia Pacific (Jakarta)"),
    endpoint("ap-southeast-4", "Asia Pacific (Melbourne)"),
    endpoint("ap-southeast-5", "Asia Pacific (Malaysia)"),
    endpoint("ap-southeast-7", "Asia Pacific (Thailand)"),
    endpoint("ap-northeast-1", "Asia Pacific (Tokyo)"),
    endpoint("ap-northeast-2", "Asia Pacific (Seoul)"),
    endpoint("ap-northeast-3", "Asia Pacific (Osaka)"),
    endpoint("ca-central-1", "Canada (Central)"),
    endpoint("ca-west-1", "Canada West (Calgary)"),
    endpoint("eu-central-1", "Europe (Frankfurt)"),
    endpoint("eu-central-2", "Europe (Zurich)"),
    endpoint("eu-west-1", "Europe (Ireland)"),
    endpoint("eu-west-2", "Europe (London)"),
    endpoint("eu-west-3", "Europe (Paris)"),
    endpoint("eu-south-1", "Europe (Milan)"),
    endpoint("eu-south-2", "Europe (Spain)"),
    endpoint("eu-north-1", "Europe (Stockholm)"),
    endpoint("il-central-1", "Israel (Tel Aviv)"),
    endpoint("me-south-1", "Middle East (Bahrain)"),
    endpoint("me-central-1", "Middle East (UAE)"),
    endpoint("mx-central-1", "Mexico (Central)"),
    endpoint("sa-east-1", "South America (Sao Paulo)"),
    endpoint("us-gov-east-1", "AWS GovCloud (US-East)"),
    endpoint("us-gov-west-1", "AWS GovCloud (US-West)"),
    endpoint("cn-north-1", "China (Beijing)"),
    endpoint("cn-northwest-1", "China (Ningxia)"),
];

/// Index of the region token in a colon-delimited ARN.
const REGION_FIELD: usize = 3;

impl RegionEndpoint {
    /// Look up an endpoint by its exact system name.
    ///
    /// Matching is case-sensitive: `US-EAST-1` is not a region.
    #[must_use]
    pub fn by_system_name(name: &str) -> Option<&'static RegionEndpoint> {
        REGION_ENDPOINTS.iter().find(|r| r.system_name == name)
    }

    /// Region value for AWS SDK client configuration.
    #[must_use]
    pub fn sdk_region(&self) -> Region {
        Region::new(self.system_name)
    }
}

/// Resolve the regional endpoint encoded in a CA ARN.
///
/// ARNs are `partition:service:region:account:resource`, prefixed with
/// `arn:`; the region is the fourth colon-delimited field.
pub fn resolve(ca_arn: &str) -> ConnectorResult<&'static RegionEndpoint> {
    let region = ca_arn
        .split(':')
        .nth(REGION_FIELD)
        .ok_or_else(|| ConnectorError::MalformedIdentifier {
            identifier: ca_arn.to_string(),
            message: format!("expected at least {} colon-delimited fields", REGION_FIELD + 1),
        })?;

    RegionEndpoint::by_system_name(region).ok_or_else(|| ConnectorError::UnknownEndpoint {
        region: region.to_string(),
    })
}
