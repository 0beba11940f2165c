//! Table mapping.
//!
//! Translates an [`EntitySchema`] into a backing table definition and
//! converts encoded records to and from stored rows.
//!
//! Row layout:
//! - `id` (text, partition key): composite identity
//! - `history_timestamp` (timestamp, range key): only for history schemas
//! - `insert_timestamp` (timestamp): write time
//! - `data` (text): encoded blob, for complex schemas
//! - one attribute per field, for flat schemas

mod clock;

pub use clock::HistoryClock;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use tracing::info;

use crate::codec::{Document, Encoded, Raw};
use crate::error::{DecodeError, Error, Result};
use crate::interfaces::{AttributeValue, Row, StoreError, TableStore};
use crate::schema::{EntitySchema, FieldDef, FieldKind};

pub const ID_ATTRIBUTE: &str = "id";
pub const INSERT_TIMESTAMP: &str = "insert_timestamp";
pub const HISTORY_TIMESTAMP: &str = "history_timestamp";
pub const DATA_ATTRIBUTE: &str = "data";

/// Attribute types understood by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Text,
    Numeric,
    Boolean,
    /// RFC 3339 UTC text with fixed nanosecond precision; sorts lexically.
    Timestamp,
}

impl AttributeType {
    /// Attribute type of a flat-encoded field.
    pub fn for_field(schema: &EntitySchema, field: &FieldDef) -> Result<Self> {
        match field.kind {
            FieldKind::Integer | FieldKind::Float => Ok(AttributeType::Numeric),
            FieldKind::String => Ok(AttributeType::Text),
            FieldKind::Boolean => Ok(AttributeType::Boolean),
            other => Err(Error::Schema(format!(
                "Unsupported type {} for field {} of {}",
                other,
                field.name,
                schema.type_name()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition: KeyAttribute,
    pub range: Option<KeyAttribute>,
}

/// Backing table layout for one entity schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub key_schema: KeySchema,
    /// Non-key attributes in layout order.
    pub attributes: Vec<(String, AttributeType)>,
}

impl TableDefinition {
    /// Map `schema` onto a table called `name`.
    ///
    /// Fails with [`Error::Schema`] if a flat schema holds a field type the
    /// store cannot represent as a plain attribute.
    pub fn for_schema(schema: &EntitySchema, name: impl Into<String>) -> Result<Self> {
        let range = schema.keep_history().then(|| KeyAttribute {
            name: HISTORY_TIMESTAMP.to_string(),
            attribute_type: AttributeType::Timestamp,
        });

        let mut attributes = vec![(INSERT_TIMESTAMP.to_string(), AttributeType::Timestamp)];
        if schema.is_complex() {
            attributes.push((DATA_ATTRIBUTE.to_string(), AttributeType::Text));
        } else {
            for field in schema.fields() {
                attributes.push((field.name.to_string(), AttributeType::for_field(schema, field)?));
            }
        }

        Ok(Self {
            name: name.into(),
            key_schema: KeySchema {
                partition: KeyAttribute {
                    name: ID_ATTRIBUTE.to_string(),
                    attribute_type: AttributeType::Text,
                },
                range,
            },
            attributes,
        })
    }

    pub fn has_range_key(&self) -> bool {
        self.key_schema.range.is_some()
    }
}

/// Create the table unless it already exists.
///
/// Blocks until the store reports the new table ready.
pub async fn ensure_table(store: &dyn TableStore, definition: &TableDefinition) -> Result<()> {
    if store.table_exists(&definition.name).await? {
        return Ok(());
    }

    info!(
        table = %definition.name,
        history = definition.has_range_key(),
        "Creating table"
    );
    match store.create_table(definition).await {
        // Lost a creation race with another writer.
        Ok(()) | Err(StoreError::TableExists(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Format a timestamp the way timestamp attributes are stored.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Assemble the stored row for one encoded record.
pub fn build_row(
    schema: &EntitySchema,
    id: String,
    encoded: Encoded,
    inserted_at: DateTime<Utc>,
    history_at: Option<DateTime<Utc>>,
) -> Result<Row> {
    let mut row = Row::new();

    match encoded {
        Encoded::Blob(text) => {
            row.insert(DATA_ATTRIBUTE.to_string(), AttributeValue::S(text));
        }
        Encoded::Flat(document) => {
            for (name, value) in document {
                let field = schema.field(&name).ok_or_else(|| Error::Encoding {
                    entity: schema.type_name().to_string(),
                    message: format!("field `{}` is not in the schema", name),
                })?;
                row.insert(name, to_attribute(schema, field, value)?);
            }
        }
    }

    row.insert(ID_ATTRIBUTE.to_string(), AttributeValue::S(id));
    row.insert(
        INSERT_TIMESTAMP.to_string(),
        AttributeValue::S(format_timestamp(inserted_at)),
    );
    if let Some(at) = history_at {
        row.insert(HISTORY_TIMESTAMP.to_string(), AttributeValue::S(format_timestamp(at)));
    }
    Ok(row)
}

/// Strip bookkeeping attributes and recover the record's encoded form.
pub fn row_to_raw(schema: &EntitySchema, mut row: Row) -> Result<Raw> {
    if schema.is_complex() {
        return match row.remove(DATA_ATTRIBUTE) {
            Some(AttributeValue::S(text)) => Ok(Raw::Text(text)),
            Some(other) => Err(DecodeError::TypeMismatch {
                entity: schema.type_name().to_string(),
                field: DATA_ATTRIBUTE.to_string(),
                expected: "text".to_string(),
                found: other.to_string(),
            }
            .into()),
            None => Err(missing(schema, DATA_ATTRIBUTE).into()),
        };
    }

    row.remove(ID_ATTRIBUTE);
    row.remove(INSERT_TIMESTAMP);
    row.remove(HISTORY_TIMESTAMP);

    let mut document = Document::new();
    for (name, attribute) in row {
        let field = schema.field(&name).ok_or_else(|| DecodeError::UnknownField {
            entity: schema.type_name().to_string(),
            field: name.clone(),
        })?;
        let value = from_attribute(schema, field, attribute)?;
        document.insert(name, value);
    }
    Ok(Raw::Mapping(document))
}

/// Partition key of a stored row.
pub fn row_id<'a>(schema: &EntitySchema, row: &'a Row) -> Result<&'a str> {
    row.get(ID_ATTRIBUTE)
        .and_then(AttributeValue::as_s)
        .ok_or_else(|| missing(schema, ID_ATTRIBUTE).into())
}

fn to_attribute(schema: &EntitySchema, field: &FieldDef, value: Value) -> Result<AttributeValue> {
    let attribute = match (AttributeType::for_field(schema, field)?, value) {
        (_, Value::Null) => AttributeValue::Null,
        (AttributeType::Text, Value::String(s)) => AttributeValue::S(s),
        (AttributeType::Boolean, Value::Bool(b)) => AttributeValue::Bool(b),
        (AttributeType::Numeric, Value::Number(n)) => AttributeValue::N(n.to_string()),
        (expected, other) => {
            return Err(Error::Encoding {
                entity: schema.type_name().to_string(),
                message: format!("`{}` holds {}, expected {:?}", field.name, other, expected),
            })
        }
    };
    Ok(attribute)
}

fn from_attribute(
    schema: &EntitySchema,
    field: &FieldDef,
    attribute: AttributeValue,
) -> std::result::Result<Value, DecodeError> {
    let mismatch = |found: &AttributeValue| DecodeError::TypeMismatch {
        entity: schema.type_name().to_string(),
        field: field.name.to_string(),
        expected: field.kind.to_string(),
        found: found.to_string(),
    };

    match (field.kind, &attribute) {
        (_, AttributeValue::Null) => Ok(Value::Null),
        (FieldKind::String, AttributeValue::S(s)) => Ok(Value::String(s.clone())),
        (FieldKind::Boolean, AttributeValue::Bool(b)) => Ok(Value::Bool(*b)),
        (FieldKind::Integer, AttributeValue::N(n)) => n
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| n.parse::<u64>().map(Value::from))
            .map_err(|_| mismatch(&attribute)),
        (FieldKind::Float, AttributeValue::N(n)) => n
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch(&attribute)),
        _ => Err(mismatch(&attribute)),
    }
}

fn missing(schema: &EntitySchema, attribute: &str) -> DecodeError {
    DecodeError::MissingAttribute {
        entity: schema.type_name().to_string(),
        attribute: attribute.to_string(),
    }
}
