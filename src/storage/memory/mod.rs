//! In-memory table store.
//!
//! Rows live in a `BTreeMap` keyed by (partition, range), so a partition's
//! rows come back in range-key order. Deletion can be made to lag behind
//! the delete request to mimic services where tables disappear
//! asynchronously.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::interfaces::{AttributeValue, Row, RowKey, ScanFilter, StoreError, TableStore};
use crate::table::TableDefinition;

type Result<T> = std::result::Result<T, StoreError>;

/// (partition value, range value or empty).
type StorageKey = (String, String);

struct MemoryTable {
    definition: TableDefinition,
    rows: BTreeMap<StorageKey, Row>,
}

impl MemoryTable {
    fn key_of(&self, row: &Row) -> Result<StorageKey> {
        let attribute = |name: &str| {
            row.get(name).and_then(AttributeValue::as_s).ok_or_else(|| {
                StoreError::Backend(format!(
                    "row for table {} is missing key attribute `{}`",
                    self.definition.name, name
                ))
            })
        };

        let id = attribute(&self.definition.key_schema.partition.name)?.to_string();
        let range = match &self.definition.key_schema.range {
            Some(range) => attribute(&range.name)?.to_string(),
            None => String::new(),
        };
        Ok((id, range))
    }
}

/// Process-local table store.
#[derive(Default)]
pub struct InMemoryTableStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    /// Tables being deleted: remaining existence checks that still see them.
    deleting: RwLock<HashMap<String, usize>>,
    deletion_lag: RwLock<usize>,
    fail_on_put: RwLock<bool>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep deleted tables visible to the next `checks` existence checks.
    pub async fn set_deletion_lag(&self, checks: usize) {
        *self.deletion_lag.write().await = checks;
    }

    pub async fn set_fail_on_put(&self, fail: bool) {
        *self.fail_on_put.write().await = fail;
    }

    pub async fn row_count(&self, name: &str) -> usize {
        self.tables
            .read()
            .await
            .get(name)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn definition(&self, name: &str) -> Option<TableDefinition> {
        self.tables
            .read()
            .await
            .get(name)
            .map(|t| t.definition.clone())
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn table_exists(&self, name: &str) -> Result<bool> {
        {
            let mut deleting = self.deleting.write().await;
            if let Some(remaining) = deleting.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(true);
                }
                deleting.remove(name);
            }
        }
        Ok(self.tables.read().await.contains_key(name))
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        if self.deleting.read().await.contains_key(&definition.name) {
            return Err(StoreError::TableExists(definition.name.clone()));
        }
        let mut tables = self.tables.write().await;
        if tables.contains_key(&definition.name) {
            return Err(StoreError::TableExists(definition.name.clone()));
        }
        tables.insert(
            definition.name.clone(),
            MemoryTable {
                definition: definition.clone(),
                rows: BTreeMap::new(),
            },
        );
        debug!(table = %definition.name, "Created in-memory table");
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<()> {
        if self.tables.write().await.remove(name).is_none() {
            return Err(StoreError::TableNotFound(name.to_string()));
        }
        let lag = *self.deletion_lag.read().await;
        if lag > 0 {
            self.deleting.write().await.insert(name.to_string(), lag);
        }
        Ok(())
    }

    async fn put_row(&self, name: &str, row: Row) -> Result<()> {
        if *self.fail_on_put.read().await {
            return Err(StoreError::Backend(format!("put into {} rejected", name)));
        }
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        let key = table.key_of(&row)?;
        table.rows.insert(key, row);
        Ok(())
    }

    async fn get_row(&self, name: &str, key: &RowKey) -> Result<Option<Row>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        let storage_key = (key.id.clone(), key.range.clone().unwrap_or_default());
        Ok(table.rows.get(&storage_key).cloned())
    }

    async fn scan(&self, name: &str, filter: &ScanFilter) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        Ok(table
            .rows
            .iter()
            .filter(|((id, _), _)| filter.matches(id))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn query(&self, name: &str, partition_key: &str) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        Ok(table
            .rows
            .range((partition_key.to_string(), String::new())..)
            .take_while(|((id, _), _)| id == partition_key)
            .map(|(_, row)| row.clone())
            .collect())
    }
}
