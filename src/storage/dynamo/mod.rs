//! DynamoDB TableStore implementation.
//!
//! Table layout follows [`TableDefinition`]: `id` (S) is the hash key and,
//! for history schemas, `history_timestamp` (S) is the range key. Only key
//! attributes are declared to DynamoDB; the remaining attributes are
//! schemaless on the service side.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue as DynamoValue, BillingMode, KeySchemaElement, KeyType,
    ProvisionedThroughput, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use crate::config::DynamoConfig;
use crate::interfaces::{AttributeValue, Row, RowKey, ScanFilter, StoreError, TableStore};
use crate::table::{AttributeType, KeyAttribute, TableDefinition, HISTORY_TIMESTAMP, ID_ATTRIBUTE};

type Result<T> = std::result::Result<T, StoreError>;

type Item = HashMap<String, DynamoValue>;

/// DynamoDB implementation of TableStore.
pub struct DynamoTableStore {
    client: Client,
    read_capacity: i64,
    write_capacity: i64,
    ready_poll_interval: Duration,
}

impl DynamoTableStore {
    /// Connect using the SDK's default credential chain.
    pub async fn connect(config: &DynamoConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let client = if let Some(endpoint) = &config.endpoint_url {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&shared)
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamo_config)
        } else {
            Client::new(&shared)
        };

        info!(endpoint = ?config.endpoint_url, "Connected to DynamoDB");
        Ok(Self::with_client(client, config))
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client, config: &DynamoConfig) -> Self {
        Self {
            client,
            read_capacity: config.read_capacity,
            write_capacity: config.write_capacity,
            ready_poll_interval: Duration::from_millis(config.ready_poll_interval_ms),
        }
    }

    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>> {
        match self.client.describe_table().table_name(name).send().await {
            Ok(output) => Ok(output
                .table()
                .and_then(|t| t.table_status())
                .cloned()
                .or(Some(TableStatus::Active))),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    Ok(None)
                } else {
                    Err(backend("describe_table", err))
                }
            }
        }
    }

    fn key_element(attribute: &KeyAttribute, key_type: KeyType) -> Result<KeySchemaElement> {
        KeySchemaElement::builder()
            .attribute_name(&attribute.name)
            .key_type(key_type)
            .build()
            .map_err(|e| backend("key schema", e))
    }

    fn attribute_definition(attribute: &KeyAttribute) -> Result<AttributeDefinition> {
        let scalar = match attribute.attribute_type {
            AttributeType::Numeric => ScalarAttributeType::N,
            AttributeType::Text | AttributeType::Timestamp => ScalarAttributeType::S,
            AttributeType::Boolean => {
                return Err(StoreError::Backend(format!(
                    "boolean key attribute `{}` is not supported",
                    attribute.name
                )))
            }
        };
        AttributeDefinition::builder()
            .attribute_name(&attribute.name)
            .attribute_type(scalar)
            .build()
            .map_err(|e| backend("attribute definition", e))
    }
}

#[async_trait]
impl TableStore for DynamoTableStore {
    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.table_status(name).await?.is_some())
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        let keys = &definition.key_schema;
        let mut key_schema = vec![Self::key_element(&keys.partition, KeyType::Hash)?];
        let mut attribute_definitions = vec![Self::attribute_definition(&keys.partition)?];
        if let Some(range) = &keys.range {
            key_schema.push(Self::key_element(range, KeyType::Range)?);
            attribute_definitions.push(Self::attribute_definition(range)?);
        }

        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(self.read_capacity)
            .write_capacity_units(self.write_capacity)
            .build()
            .map_err(|e| backend("provisioned throughput", e))?;

        let created = self
            .client
            .create_table()
            .table_name(&definition.name)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(attribute_definitions))
            .billing_mode(BillingMode::Provisioned)
            .provisioned_throughput(throughput)
            .send()
            .await;

        if let Err(err) = created {
            let in_use = err
                .as_service_error()
                .map(|e| e.is_resource_in_use_exception())
                .unwrap_or(false);
            return Err(if in_use {
                StoreError::TableExists(definition.name.clone())
            } else {
                backend("create_table", err)
            });
        }

        // Block until the service reports the table usable.
        loop {
            match self.table_status(&definition.name).await? {
                Some(TableStatus::Active) => break,
                status => {
                    debug!(table = %definition.name, ?status, "Waiting for table to become active");
                    tokio::time::sleep(self.ready_poll_interval).await;
                }
            }
        }

        info!(table = %definition.name, "Created DynamoDB table");
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<()> {
        match self.client.delete_table().table_name(name).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    Err(StoreError::TableNotFound(name.to_string()))
                } else {
                    Err(backend("delete_table", err))
                }
            }
        }
    }

    async fn put_row(&self, name: &str, row: Row) -> Result<()> {
        let item: Item = row
            .into_iter()
            .map(|(attribute, value)| (attribute, to_dynamo(value)))
            .collect();

        self.client
            .put_item()
            .table_name(name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| backend("put_item", e))?;
        Ok(())
    }

    async fn get_row(&self, name: &str, key: &RowKey) -> Result<Option<Row>> {
        let mut request = self
            .client
            .get_item()
            .table_name(name)
            .consistent_read(true)
            .key(ID_ATTRIBUTE, DynamoValue::S(key.id.clone()));
        if let Some(range) = &key.range {
            request = request.key(HISTORY_TIMESTAMP, DynamoValue::S(range.clone()));
        }

        let output = request.send().await.map_err(|e| backend("get_item", e))?;
        output.item.map(from_item).transpose()
    }

    async fn scan(&self, name: &str, filter: &ScanFilter) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(name)
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take());

            if !filter.id_contains.is_empty() {
                let expression = (0..filter.id_contains.len())
                    .map(|i| format!("contains(#id, :v{})", i))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                request = request
                    .filter_expression(expression)
                    .expression_attribute_names("#id", ID_ATTRIBUTE);
                for (i, fragment) in filter.id_contains.iter().enumerate() {
                    request = request
                        .expression_attribute_values(format!(":v{}", i), DynamoValue::S(fragment.clone()));
                }
            }

            let output = request.send().await.map_err(|e| backend("scan", e))?;
            for item in output.items.unwrap_or_default() {
                rows.push(from_item(item)?);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(rows)
    }

    async fn query(&self, name: &str, partition_key: &str) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(name)
                .consistent_read(true)
                .key_condition_expression("#id = :id")
                .expression_attribute_names("#id", ID_ATTRIBUTE)
                .expression_attribute_values(":id", DynamoValue::S(partition_key.to_string()))
                .scan_index_forward(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| backend("query", e))?;

            for item in output.items.unwrap_or_default() {
                rows.push(from_item(item)?);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(rows)
    }
}

fn to_dynamo(value: AttributeValue) -> DynamoValue {
    match value {
        AttributeValue::S(s) => DynamoValue::S(s),
        AttributeValue::N(n) => DynamoValue::N(n),
        AttributeValue::Bool(b) => DynamoValue::Bool(b),
        AttributeValue::Null => DynamoValue::Null(true),
    }
}

fn from_item(item: Item) -> Result<Row> {
    item.into_iter()
        .map(|(attribute, value)| {
            let converted = match value {
                DynamoValue::S(s) => AttributeValue::S(s),
                DynamoValue::N(n) => AttributeValue::N(n),
                DynamoValue::Bool(b) => AttributeValue::Bool(b),
                DynamoValue::Null(_) => AttributeValue::Null,
                other => {
                    return Err(StoreError::Backend(format!(
                        "unsupported DynamoDB attribute `{}`: {:?}",
                        attribute, other
                    )))
                }
            };
            Ok((attribute, converted))
        })
        .collect()
}

fn backend(operation: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("DynamoDB {} failed: {}", operation, err))
}
