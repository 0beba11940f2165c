//! Storage configuration types.

use serde::Deserialize;

/// Store type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    #[default]
    Memory,
    Dynamo,
}

/// Table store configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store type discriminator.
    #[serde(rename = "type")]
    pub store_type: StoreType,
    /// DynamoDB-specific configuration.
    pub dynamo: DynamoConfig,
}

/// DynamoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    /// AWS region. Falls back to the SDK's default provider chain when unset.
    pub region: Option<String>,
    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    pub endpoint_url: Option<String>,
    /// Provisioned read capacity units for created tables.
    pub read_capacity: i64,
    /// Provisioned write capacity units for created tables.
    pub write_capacity: i64,
    /// Delay between readiness checks after creating a table.
    pub ready_poll_interval_ms: u64,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            read_capacity: 1,
            write_capacity: 1,
            ready_poll_interval_ms: 500,
        }
    }
}
