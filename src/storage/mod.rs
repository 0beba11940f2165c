//! Table store implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StoreConfig, StoreType};
use crate::interfaces::{StoreError, TableStore};

pub mod memory;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use memory::InMemoryTableStore;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoTableStore;

/// Initialize the table store selected by configuration.
pub async fn init_store(config: &StoreConfig) -> Result<Arc<dyn TableStore>, StoreError> {
    match config.store_type {
        StoreType::Memory => {
            info!("Table store: in-memory");
            Ok(Arc::new(InMemoryTableStore::new()))
        }
        #[cfg(feature = "dynamo")]
        StoreType::Dynamo => {
            info!(
                endpoint = ?config.dynamo.endpoint_url,
                region = ?config.dynamo.region,
                "Table store: DynamoDB"
            );
            Ok(Arc::new(DynamoTableStore::connect(&config.dynamo).await?))
        }
        #[cfg(not(feature = "dynamo"))]
        StoreType::Dynamo => {
            tracing::error!("DynamoDB store requested but 'dynamo' feature is not enabled");
            Err(StoreError::Backend("DynamoDB feature not enabled".to_string()))
        }
    }
}
