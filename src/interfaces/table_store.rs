//! Tabular key-value store interface.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::table::TableDefinition;

/// Errors raised by table store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A single attribute value as held by the backing store.
///
/// Numbers travel as their decimal text, the way the managed table service
/// represents them on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    S(String),
    N(String),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::S(s) | AttributeValue::N(s) => f.write_str(s),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Null => f.write_str("null"),
        }
    }
}

/// One stored row: attribute name to value.
pub type Row = BTreeMap<String, AttributeValue>;

/// Full primary key of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    /// Partition key value.
    pub id: String,
    /// Range key value, for tables that have one.
    pub range: Option<String>,
}

impl RowKey {
    pub fn partition(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            range: None,
        }
    }

    pub fn with_range(id: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            range: Some(range.into()),
        }
    }
}

/// Server-side scan predicate.
///
/// A row matches when its partition key contains every listed substring.
/// An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub id_contains: Vec<String>,
}

impl ScanFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn id_contains<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_contains: fragments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        self.id_contains.iter().all(|fragment| id.contains(fragment.as_str()))
    }
}

/// Interface for range-keyed table storage.
///
/// Implementations:
/// - `InMemoryTableStore`: process-local tables (tests, local development)
/// - `DynamoTableStore`: Amazon DynamoDB
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Whether the named table currently exists.
    async fn table_exists(&self, name: &str) -> Result<bool>;

    /// Create a table. Returns once the table is ready for reads and writes.
    async fn create_table(&self, definition: &TableDefinition) -> Result<()>;

    /// Request deletion of a table.
    ///
    /// Deletion may complete asynchronously: `table_exists` can keep
    /// reporting `true` for a while after this returns.
    async fn delete_table(&self, name: &str) -> Result<()>;

    /// Write a row, replacing any row with the same full key.
    async fn put_row(&self, name: &str, row: Row) -> Result<()>;

    /// Fetch the row at an exact key.
    async fn get_row(&self, name: &str, key: &RowKey) -> Result<Option<Row>>;

    /// Full-table scan retaining rows that match `filter`.
    async fn scan(&self, name: &str, filter: &ScanFilter) -> Result<Vec<Row>>;

    /// All rows sharing a partition key, ordered by range key ascending.
    async fn query(&self, name: &str, partition_key: &str) -> Result<Vec<Row>>;

    /// Release client resources. Default: nothing to release.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
