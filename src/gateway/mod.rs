//! Persistence gateway.
//!
//! Runs save/load/find/history/delete-all against an injected
//! [`TableStore`], applying the identity and serialization engine and the
//! table mapping. Every operation awaits its store calls in sequence on the
//! caller's task; nothing is spawned and nothing is cached between calls.

mod collection;

pub use collection::Collection;

use std::sync::Arc;

use backon::Retryable;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::codec::{identity, Key};
use crate::config::{Config, DeletionConfig};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::interfaces::{Row, ScanFilter, StoreError, TableStore};
use crate::schema::EntitySchema;
use crate::storage;
use crate::table::{self, HistoryClock, TableDefinition, HISTORY_TIMESTAMP};
use crate::utils::retry::deletion_backoff;

/// Result of [`Gateway::delete_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableDeletion {
    /// The store no longer reports the table.
    Deleted,
    /// The table was still reported after the polling window. Deletion may
    /// still complete later.
    Pending,
}

/// Entry point for persisting entities.
pub struct Gateway {
    store: Arc<dyn TableStore>,
    deletion: DeletionConfig,
    table_prefix: Option<String>,
    clock: HistoryClock,
}

impl Gateway {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            deletion: DeletionConfig::default(),
            table_prefix: None,
            clock: HistoryClock::new(),
        }
    }

    /// Connect the configured store and build a gateway around it.
    pub async fn open(config: &Config) -> Result<Self> {
        let store = storage::init_store(&config.store).await?;
        let mut gateway = Self::new(store).with_deletion_policy(config.deletion.clone());
        if let Some(prefix) = &config.table_prefix {
            gateway = gateway.with_table_prefix(prefix.clone());
        }
        Ok(gateway)
    }

    pub fn with_deletion_policy(mut self, deletion: DeletionConfig) -> Self {
        self.deletion = deletion;
        self
    }

    /// Prefix every table name, e.g. to isolate environments sharing a store.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    /// Release the store client.
    pub async fn close(self) -> Result<()> {
        self.store.close().await?;
        debug!("Gateway closed");
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Typed handle for one entity type.
    pub fn collection<T: Entity>(&self) -> Collection<'_, T> {
        Collection::new(self)
    }

    pub fn table_name(&self, schema: &EntitySchema) -> String {
        match &self.table_prefix {
            Some(prefix) => format!("{}_{}", prefix, schema.collection_name()),
            None => schema.collection_name(),
        }
    }

    /// Map the schema onto a table definition and create the table if needed.
    pub async fn resolve_table(&self, schema: &EntitySchema) -> Result<TableDefinition> {
        let definition = TableDefinition::for_schema(schema, self.table_name(schema))?;
        table::ensure_table(self.store.as_ref(), &definition).await?;
        Ok(definition)
    }

    /// Write a record.
    ///
    /// Without history the row for the record's identity is replaced. With
    /// history a new row is appended under a fresh range key.
    pub async fn save<T: Entity>(&self, record: &T) -> Result<()> {
        let schema = T::schema();
        let id = record.id()?;
        let encoded = record.encode()?;
        let definition = self.resolve_table(schema).await?;

        let history_at = schema.keep_history().then(|| self.clock.next());
        let row = table::build_row(schema, id.clone(), encoded, Utc::now(), history_at)?;
        self.store.put_row(&definition.name, row).await?;

        debug!(table = %definition.name, id = %id, "Saved row");
        Ok(())
    }

    /// Fetch the record whose identity fields equal `key`.
    ///
    /// Every identity field must be present in `key`. For history schemas the
    /// most recent row is returned.
    pub async fn load<T: Entity>(&self, key: &Key) -> Result<Option<T>> {
        let schema = T::schema();
        let id = identity::compose_key(schema, key)?;
        let definition = self.resolve_table(schema).await?;

        let mut rows = self.store.query(&definition.name, &id).await?;
        debug!(table = %definition.name, id = %id, rows = rows.len(), "Loaded rows");

        let row = match rows.len() {
            0 => return Ok(None),
            1 => rows.remove(0),
            _ if schema.keep_history() => latest(rows),
            count => {
                return Err(Error::Integrity {
                    table: definition.name,
                    id,
                    count,
                })
            }
        };
        decode_row(schema, row).map(Some)
    }

    /// Records whose identity carries every `name=value` pair in `key`.
    ///
    /// An empty key returns every record in the table. Names outside the
    /// identity fields are rejected.
    pub async fn find<T: Entity>(&self, key: &Key) -> Result<Vec<T>> {
        let schema = T::schema();
        let tokens = key.tokens(schema)?;
        let definition = self.resolve_table(schema).await?;

        // The store filters by substring; exact token matching drops rows
        // where `i_k=1` only occurred inside `i_k=10`.
        let rows = self
            .store
            .scan(&definition.name, &ScanFilter::id_contains(tokens.iter().cloned()))
            .await?;
        let scanned = rows.len();

        let mut matched = Vec::new();
        for row in rows {
            if identity::has_tokens(table::row_id(schema, &row)?, &tokens) {
                matched.push(decode_row(schema, row)?);
            }
        }

        debug!(
            table = %definition.name,
            scanned,
            matched = matched.len(),
            "Find completed"
        );
        Ok(matched)
    }

    /// Every saved version of `record`'s identity, oldest first.
    pub async fn history<T: Entity>(&self, record: &T) -> Result<Vec<T>> {
        let schema = T::schema();
        if !schema.keep_history() {
            return Err(Error::Usage(format!(
                "{} does not keep history",
                schema.type_name()
            )));
        }
        let id = record.id()?;
        let definition = self.resolve_table(schema).await?;

        let rows = self.store.query(&definition.name, &id).await?;
        debug!(table = %definition.name, id = %id, versions = rows.len(), "Loaded history");
        rows.into_iter().map(|row| decode_row(schema, row)).collect()
    }

    /// Drop the whole table for `T`.
    pub async fn delete_all<T: Entity>(&self) -> Result<TableDeletion> {
        self.delete_table(T::schema()).await
    }

    /// Drop the table for `schema` and wait, within the deletion policy, for
    /// the store to stop reporting it.
    ///
    /// Running out of polls is logged and reported as
    /// [`TableDeletion::Pending`], not raised.
    pub async fn delete_table(&self, schema: &EntitySchema) -> Result<TableDeletion> {
        let name = self.table_name(schema);
        let store = self.store.as_ref();

        if store.table_exists(&name).await? {
            info!(table = %name, "Deleting table");
            match store.delete_table(&name).await {
                Ok(()) | Err(StoreError::TableNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let table_name = name.as_str();
        let poll = move || async move {
            match store.table_exists(table_name).await {
                Ok(true) => Err(DeletionPoll::StillExists),
                Ok(false) => Ok(()),
                Err(e) => Err(DeletionPoll::Store(e)),
            }
        };

        let outcome = poll
            .retry(deletion_backoff(&self.deletion))
            .when(|e| matches!(e, DeletionPoll::StillExists))
            .notify(|_, delay| info!(table = %name, ?delay, "Waiting for deletion of table"))
            .await;

        match outcome {
            Ok(()) => Ok(TableDeletion::Deleted),
            Err(DeletionPoll::StillExists) => {
                warn!(
                    table = %name,
                    retries = self.deletion.max_retries,
                    "Table still exists after deletion polling"
                );
                Ok(TableDeletion::Pending)
            }
            Err(DeletionPoll::Store(e)) => Err(e.into()),
        }
    }
}

enum DeletionPoll {
    StillExists,
    Store(StoreError),
}

fn decode_row<T: Entity>(schema: &EntitySchema, row: Row) -> Result<T> {
    T::decode(table::row_to_raw(schema, row)?)
}

/// Row with the greatest history timestamp.
fn latest(rows: Vec<Row>) -> Row {
    let stamp = |row: &Row| {
        row.get(HISTORY_TIMESTAMP)
            .and_then(|v| v.as_s())
            .map(str::to_string)
    };
    rows.into_iter()
        .max_by(|a, b| stamp(a).cmp(&stamp(b)))
        .unwrap_or_default()
}
